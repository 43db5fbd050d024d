use crate::environment::Environment;
use crate::reader::ParseError;
use crate::special_forms::{self, SyntaxError};
use crate::types::{self, Arity, BadArgCount, Closure, Expression, Native, Symbol, TypeMismatch};

use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type Result<T = Expression> = std::result::Result<T, EvalError>;

#[derive(Debug)]
pub enum EvalError {
    UnboundSymbol(Symbol),
    WrongArity(BadArgCount),
    TypeMismatch(TypeMismatch),
    NotApplicable(String),
    DivisionByZero,
    IndexOutOfRange { index: types::Int, len: usize },
    KeyTypeError(String),
    BadSyntax(SyntaxError),
    InCatchHandler(ErrorDuringCatch),
    Read(ParseError),
    Io(std::io::Error),
    /// A value raised by `throw`. Caught as the value itself.
    UserThrown(Expression),
}

#[derive(Debug)]
pub struct ErrorDuringCatch {
    pub original: Box<EvalError>,
    pub then: Box<EvalError>,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnboundSymbol(s) => write!(f, "'{}' not found", s),
            EvalError::WrongArity(e) => write!(f, "{}", e),
            EvalError::TypeMismatch(e) => write!(f, "type mismatch: {}", e),
            EvalError::NotApplicable(message) => write!(f, "{}", message),
            EvalError::DivisionByZero => write!(f, "cannot divide by zero!"),
            EvalError::IndexOutOfRange { index, len } => {
                write!(f, "bad index: {} not in range [0, {})", index, len)
            }
            EvalError::KeyTypeError(key) => write!(f, "{} cannot be used as a hash-map key", key),
            EvalError::BadSyntax(e) => write!(f, "bad syntax: {}", e),
            EvalError::InCatchHandler(e) => write!(
                f,
                "{}\nWhile handling the above exception, another exception occurred: {}",
                e.original, e.then
            ),
            EvalError::Read(e) => write!(f, "read error: {}", e),
            EvalError::Io(e) => write!(f, "io error: {}", e),
            EvalError::UserThrown(e) => write!(f, "Uncaught exception: {}", e),
        }
    }
}

impl From<TypeMismatch> for EvalError {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<BadArgCount> for EvalError {
    fn from(e: BadArgCount) -> Self {
        Self::WrongArity(e)
    }
}

impl From<SyntaxError> for EvalError {
    fn from(e: SyntaxError) -> Self {
        Self::BadSyntax(e)
    }
}

impl From<types::MapError> for EvalError {
    fn from(e: types::MapError) -> Self {
        match e {
            types::MapError::UnhashableKey(key) => Self::KeyTypeError(key),
            types::MapError::MissingValue(got) => Self::WrongArity(BadArgCount {
                name: "hash-map",
                expected: Arity::Even,
                got,
            }),
        }
    }
}

impl From<std::io::Error> for EvalError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<&EvalError> for Expression {
    fn from(e: &EvalError) -> Self {
        match e {
            EvalError::UserThrown(obj) => obj.clone(),
            _ => Expression::String(e.to_string()),
        }
    }
}

/// Evaluates `orig_ast` to completion.
///
/// Special forms in tail position and calls to closures replace the current
/// expression and environment and go round the loop again instead of recursing,
/// so tail-recursive programs run in constant stack space.
pub fn eval(orig_ast: &Expression, orig_env: &Rc<Environment>) -> Result {
    let mut ast = orig_ast.clone();
    let mut env = orig_env.clone();
    loop {
        ast = macroexpand(&ast, &env)?;
        let list = match &ast {
            Expression::List(list) if !list.is_empty() => list.clone(),
            _ => return evaluate_ast(&ast, &env),
        };
        log::trace!("eval {}", ast);
        let (head, args) = match list.split_first() {
            Some(split) => split,
            None => return Ok(ast),
        };
        if let Expression::Symbol(name) = head {
            match name.as_str() {
                "def!" => {
                    let result = special_forms::apply_def(args, &env, false);
                    if let Ok(value) = &result {
                        log::debug!("define {} as {}", args[0], value);
                    }
                    return result;
                }
                "defmacro!" => return special_forms::apply_def(args, &env, true),
                "let*" => {
                    let (next_ast, next_env) = special_forms::apply_let(args, &env)?;
                    ast = next_ast;
                    env = next_env;
                    continue;
                }
                "do" => {
                    ast = special_forms::apply_do(args, &env)?;
                    continue;
                }
                "if" => {
                    ast = special_forms::apply_if(args, &env)?;
                    continue;
                }
                "fn*" => return special_forms::apply_fn(args, &env),
                "quote" => {
                    Arity::exactly(1).validate_for(args.len(), "quote")?;
                    return Ok(args[0].clone());
                }
                "quasiquote" => {
                    Arity::exactly(1).validate_for(args.len(), "quasiquote")?;
                    ast = special_forms::quasiquote(&args[0])?;
                    continue;
                }
                "quasiquoteexpand" => {
                    Arity::exactly(1).validate_for(args.len(), "quasiquoteexpand")?;
                    return special_forms::quasiquote(&args[0]);
                }
                "macroexpand" => {
                    Arity::exactly(1).validate_for(args.len(), "macroexpand")?;
                    return macroexpand(&args[0], &env);
                }
                "try*" => return special_forms::apply_try(args, &env),
                // Any other initial symbol is looked up and applied below.
                _ => (),
            }
        }
        let evaluated = evaluate_sequence_elementwise(&list, &env)?;
        let (callable, args) = match evaluated.split_first() {
            Some(split) => split,
            None => return Ok(Expression::new_list()),
        };
        match apply_step(callable, args)? {
            ApplyOutcome::Finished(obj) => return Ok(obj),
            ApplyOutcome::EvaluateFurther(next_ast, next_env) => {
                ast = next_ast;
                env = next_env;
            }
        }
    }
}

// Applying a closure only prepares its body and environment: inside `eval` we
// want to loop on those rather than recurse. Natives have nothing to continue
// with, so they always finish.
pub(crate) enum ApplyOutcome {
    Finished(Expression),
    EvaluateFurther(Expression, Rc<Environment>),
}

/// Calls `op` with already-evaluated `args` and runs it to completion.
///
/// Natives use this to call back into user code (`swap!`, `map`, `apply`).
pub fn apply(op: &Expression, args: &[Expression]) -> Result {
    match apply_step(op, args)? {
        ApplyOutcome::Finished(obj) => Ok(obj),
        ApplyOutcome::EvaluateFurther(ast, env) => eval(&ast, &env),
    }
}

pub(crate) fn apply_step(op: &Expression, args: &[Expression]) -> Result<ApplyOutcome> {
    match op {
        Expression::Native(f) => call_native(f, args).map(ApplyOutcome::Finished),
        Expression::Closure(f) => {
            let env = make_closure_env(f, args)?;
            Ok(ApplyOutcome::EvaluateFurther(f.body.clone(), env))
        }
        _ => Err(EvalError::NotApplicable(format!("{} not applicable", op))),
    }
}

pub(crate) fn evaluate_ast(ast: &Expression, env: &Rc<Environment>) -> Result {
    match ast {
        Expression::Symbol(s) => env.get(s),
        Expression::List(list) => {
            evaluate_sequence_elementwise(&list.payload, env).map(Expression::wrap_list)
        }
        Expression::Vector(vec) => {
            evaluate_sequence_elementwise(&vec.payload, env).map(Expression::wrap_vector)
        }
        Expression::Map(map) => {
            let mut evaluated = HashMap::with_capacity(map.len());
            for (key, value) in map.iter() {
                evaluated.insert(key.clone(), eval(value, env)?);
            }
            Ok(Expression::wrap_map(evaluated))
        }
        _ => Ok(ast.clone()),
    }
}

pub fn evaluate_sequence_elementwise(
    seq: &[Expression],
    env: &Rc<Environment>,
) -> Result<Vec<Expression>> {
    seq.iter().map(|obj| eval(obj, env)).collect()
}

pub(crate) fn pretty_print_args(args: &[Expression]) -> String {
    match args.len() {
        0 => "no args".into(),
        1 => args[0].to_string(),
        _ => format!("\n\t{}", args.iter().join("\n\t")),
    }
}

pub fn call_native(func: &Native, args: &[Expression]) -> Result {
    func.arity.validate_for(args.len(), func.name)?;
    log::trace!("Call {} with {}", func.name, pretty_print_args(args));
    let result = (func.handler)(args);
    match &result {
        Ok(val) => log::trace!("Call to {} resulted in {}", func.name, val),
        Err(e) => log::trace!("Call to {} failed: {}", func.name, e),
    }
    result
}

fn make_closure_env(func: &Closure, args: &[Expression]) -> Result<Rc<Environment>> {
    log::trace!("Call {} with {}", func, pretty_print_args(args));
    Ok(Environment::new(&func.env, &func.parameters, args)?)
}

/// Returns the macro closure named at the head of `ast`, if any.
fn macro_call(ast: &Expression, env: &Environment) -> Option<Rc<Closure>> {
    let list = ast.as_list().ok()?;
    let symbol = list.first()?.as_symbol().ok()?;
    let value = env.get(symbol).ok()?;
    value.as_closure().ok().filter(|c| c.is_macro).cloned()
}

/// Repeatedly expands `ast` while its head names a macro.
pub fn macroexpand(ast: &Expression, env: &Rc<Environment>) -> Result {
    let mut ast = ast.clone();
    while let Some(closure) = macro_call(&ast, env) {
        let expanded = {
            let args = &ast.as_list()?[1..];
            let env = make_closure_env(&closure, args)?;
            eval(&closure.body, &env)?
        };
        log::trace!("macroexpand {} => {}", ast, expanded);
        ast = expanded;
    }
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn native_add() -> Expression {
        Expression::new_native(Native::new(
            "+",
            Arity::exactly(2),
            Rc::new(|args: &[Expression]| -> Result {
                Ok(Expression::Integer(args[0].as_int()? + args[1].as_int()?))
            }),
        ))
    }

    fn env_with_add() -> Rc<Environment> {
        let env = Environment::root();
        env.set("+", native_add());
        env
    }

    fn eval_str(input: &str, env: &Rc<Environment>) -> Result {
        eval(&read_str(input).unwrap(), env)
    }

    #[test]
    fn self_evaluating_forms() {
        let env = Environment::root();
        assert_eq!(eval_str("7", &env).unwrap(), Expression::Integer(7));
        assert_eq!(eval_str("()", &env).unwrap(), Expression::new_list());
        assert_eq!(eval_str(":k", &env).unwrap(), Expression::Keyword("k".into()));
    }

    #[test]
    fn collections_evaluate_their_children() {
        let env = env_with_add();
        assert_eq!(
            eval_str("[1 (+ 1 1)]", &env).unwrap(),
            read_str("[1 2]").unwrap()
        );
        assert_eq!(
            eval_str("{:a (+ 1 1)}", &env).unwrap(),
            read_str("{:a 2}").unwrap()
        );
    }

    #[test]
    fn applies_natives_and_closures() {
        let env = env_with_add();
        assert_eq!(eval_str("(+ 1 2)", &env).unwrap(), Expression::Integer(3));
        assert_eq!(
            eval_str("((fn* (a b) (+ a b)) 3 4)", &env).unwrap(),
            Expression::Integer(7)
        );
    }

    #[test]
    fn public_apply_runs_closures_to_completion() {
        let env = env_with_add();
        let closure = eval_str("(fn* (x) (+ x 10))", &env).unwrap();
        assert_eq!(
            apply(&closure, &[Expression::Integer(5)]).unwrap(),
            Expression::Integer(15)
        );
        assert_eq!(
            apply(&native_add(), &[Expression::Integer(1), Expression::Integer(1)]).unwrap(),
            Expression::Integer(2)
        );
    }

    #[test]
    fn non_functions_are_not_applicable() {
        let env = Environment::root();
        match eval_str("(1 2)", &env) {
            Err(EvalError::NotApplicable(message)) => assert_eq!(message, "1 not applicable"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            apply(&Expression::String("f".into()), &[]),
            Err(EvalError::NotApplicable(_))
        ));
    }

    #[test]
    fn unbound_symbols_fail() {
        let env = Environment::root();
        assert!(matches!(
            eval_str("nope", &env),
            Err(EvalError::UnboundSymbol(_))
        ));
    }

    #[test]
    fn native_arity_is_checked() {
        let env = env_with_add();
        assert!(matches!(
            eval_str("(+ 1)", &env),
            Err(EvalError::WrongArity(_))
        ));
    }

    #[test]
    fn odd_map_entries_report_their_count() {
        let err = EvalError::from(types::build_map(vec![Expression::Nil; 3]).unwrap_err());
        match err {
            EvalError::WrongArity(BadArgCount { got, .. }) => assert_eq!(got, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn errors_become_expressions() {
        let thrown = EvalError::UserThrown(Expression::Integer(3));
        assert_eq!(Expression::from(&thrown), Expression::Integer(3));
        let unbound = EvalError::UnboundSymbol("x".into());
        assert_eq!(
            Expression::from(&unbound),
            Expression::String("'x' not found".into())
        );
    }
}
