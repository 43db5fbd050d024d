//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;
pub use tinylisp::interpreter::{self, Error};
pub use tinylisp::{Environment, EvalError, Expression, ParseError};

/// A fresh root environment with natives and prelude installed.
pub fn new_env() -> Rc<Environment> {
    interpreter::repl_env(&[]).expect("prelude should load")
}

/// Reads, evaluates and prints each line in turn in one environment, returning the last output.
pub fn rep_all(env: &Rc<Environment>, lines: &[&str]) -> Result<String, Error> {
    let mut last = String::new();
    for line in lines {
        last = interpreter::rep(line, env)?;
    }
    Ok(last)
}

/// Evaluates `input` in a fresh environment and prints the result readably.
pub fn rep(input: &str) -> Result<String, Error> {
    interpreter::rep(input, &new_env())
}

pub fn eval_str(input: &str) -> Result<Expression, Error> {
    let env = new_env();
    let ast = interpreter::read(input)?;
    interpreter::eval(&ast, &env)
}

/// Asserts that `input` prints as `expected` when evaluated in a fresh environment.
macro_rules! assert_rep {
    ($input:expr, $expected:expr) => {
        match $crate::common::rep($input) {
            Ok(output) => assert_eq!(output, $expected, "evaluating {}", $input),
            Err(e) => panic!("evaluating {} failed: {}", $input, e),
        }
    };
}

/// Asserts that evaluating `input` fails with an error matching `pattern`.
macro_rules! assert_eval_err {
    ($input:expr, $pattern:pat) => {
        match $crate::common::eval_str($input) {
            Err($crate::common::Error::Eval($pattern)) => {}
            other => panic!("evaluating {}: unexpected result {:?}", $input, other),
        }
    };
}
