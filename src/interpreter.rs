use crate::environment::Environment;
use crate::evaluator::{self, EvalError};
use crate::printer::{self, PrintMode};
use crate::reader::{self, ParseError};
use crate::types::{Arity, Expression, Native, NativeHandler};
use std::fmt;
use std::rc::Rc;

pub type Result<T = Expression> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Read(ParseError),
    Eval(EvalError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl Error {
    /// Blank lines are reported as errors by the reader but shouldn't be shown.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, Error::Read(ParseError::EmptyInput))
    }
}

// Definitions written in the language itself, evaluated into every fresh root environment.
const PRELUDE: &[&str] = &[
    "(def! not (fn* (a) (if a false true)))",
    r#"(def! load-file (fn* (f) (eval (read-string (str "(do " (slurp f) "\nnil)")))))"#,
    r#"(defmacro! cond (fn* (& xs) (if (> (count xs) 0) (list 'if (first xs) (if (> (count xs) 1) (nth xs 1) (throw "odd number of forms to cond")) (cons 'cond (rest (rest xs)))))))"#,
];

pub fn read(line: &str) -> Result {
    reader::read_str(line).map_err(Error::Read)
}

pub fn eval(obj: &Expression, env: &Rc<Environment>) -> Result {
    evaluator::eval(obj, env).map_err(Error::Eval)
}

pub fn print(obj: &Expression) -> String {
    printer::pr_str(obj, PrintMode::ReadableRepresentation)
}

pub fn rep(line: &str, env: &Rc<Environment>) -> Result<String> {
    let ast = read(line)?;
    let value = eval(&ast, env)?;
    Ok(print(&value))
}

/// Binds `eval`, which evaluates its argument in `env` rather than the caller's scope.
pub fn add_eval(env: &Rc<Environment>) {
    // Weak, since `env` itself will hold this native.
    let root = Rc::downgrade(env);
    let handler: NativeHandler = Rc::new(move |args: &[Expression]| -> evaluator::Result {
        let env = root.upgrade().ok_or_else(|| {
            EvalError::NotApplicable("eval: its environment no longer exists".into())
        })?;
        log::info!("Call from user code to eval with {}", args[0]);
        evaluator::eval(&args[0], &env)
    });
    env.set(
        "eval",
        Expression::new_native(Native::new("eval", Arity::exactly(1), handler)),
    );
}

pub fn read_prelude(env: &Rc<Environment>) -> Result<()> {
    for definition in PRELUDE {
        rep(definition, env)?;
    }
    Ok(())
}

/// A root environment with the natives, `eval`, the prelude and `*ARGV*` in place.
pub fn repl_env(argv: &[String]) -> Result<Rc<Environment>> {
    let env = Environment::root();
    crate::core::install(&env);
    add_eval(&env);
    env.set("*host-language*", Expression::String("rust".into()));
    let argv = argv.iter().cloned().map(Expression::String).collect();
    env.set("*ARGV*", Expression::wrap_list(argv));
    read_prelude(&env)?;
    Ok(env)
}
