use crate::environment::Environment;
use crate::evaluator::{eval, ErrorDuringCatch, EvalError, Result};
use crate::types::{truthy, Arity, BadParameters, Closure, Expression, Parameters, Symbol};
use derive_more::Display;
use itertools::Itertools;
use std::rc::Rc;

/// Special forms used with the wrong shape of arguments.
#[derive(Debug, Display)]
pub enum SyntaxError {
    #[display(fmt = "{}: expected a symbol to bind, got {}", form, got)]
    BindToNonSymbol { form: &'static str, got: String },
    #[display(fmt = "{}: expected a list or vector of bindings", _0)]
    BindingsNotSequence(&'static str),
    #[display(fmt = "fn*: {}", _0)]
    BadVariadic(BadParameters),
    #[display(fmt = "defmacro!: {} is not a closure", _0)]
    MacroNotAClosure(String),
    #[display(fmt = "try*: expected (catch* name handler), got {}", _0)]
    MalformedCatch(String),
}

fn expect_symbol(obj: &Expression, form: &'static str) -> Result<Symbol> {
    match obj {
        Expression::Symbol(s) => Ok(s.clone()),
        _ => Err(SyntaxError::BindToNonSymbol {
            form,
            got: obj.to_string(),
        }
        .into()),
    }
}

/// `(def! name value)` and `(defmacro! name value)`: bind in the current scope.
pub fn apply_def(args: &[Expression], env: &Rc<Environment>, make_macro: bool) -> Result {
    let form = if make_macro { "defmacro!" } else { "def!" };
    Arity::exactly(2).validate_for(args.len(), form)?;
    let key = expect_symbol(&args[0], form)?;
    let value = eval(&args[1], env)?;
    let value = match make_macro {
        true => match value {
            Expression::Closure(c) => {
                let mut tweaked_closure = (*c).clone();
                tweaked_closure.is_macro = true;
                Expression::Closure(Rc::new(tweaked_closure))
            }
            other => return Err(SyntaxError::MacroNotAClosure(other.to_string()).into()),
        },
        false => value,
    };
    Ok(env.set(key, value))
}

/// `(let* (name value ...) body)`: returns the body and the scope to evaluate it in.
pub fn apply_let(args: &[Expression], env: &Rc<Environment>) -> Result<(Expression, Rc<Environment>)> {
    Arity::exactly(2).validate_for(args.len(), "let*")?;
    let (bindings, body) = (&args[0], &args[1]);
    let bindings = bindings
        .as_seq()
        .map_err(|_| SyntaxError::BindingsNotSequence("let*"))?;
    Arity::Even.validate_for(bindings.len(), "let* bindings")?;

    let child = Environment::spawn_from(env);
    for (key, value) in bindings.iter().tuples() {
        let key = expect_symbol(key, "let*")?;
        // Evaluate in the child so that later bindings can refer to earlier ones.
        let value = eval(value, &child)?;
        child.set(key, value);
    }
    Ok((body.clone(), child))
}

/// `(do form ... last)`: evaluates all but the last form and returns the last, unevaluated.
pub fn apply_do(args: &[Expression], env: &Rc<Environment>) -> Result {
    Arity::at_least(1).validate_for(args.len(), "do")?;
    let (last, init) = match args.split_last() {
        Some(split) => split,
        None => return Ok(Expression::Nil),
    };
    for obj in init {
        eval(obj, env)?;
    }
    Ok(last.clone())
}

/// `(if condition then else?)`: returns the branch to continue with.
pub fn apply_if(args: &[Expression], env: &Rc<Environment>) -> Result {
    Arity::Between(2..=3).validate_for(args.len(), "if")?;
    let condition = eval(&args[0], env)?;
    if truthy(&condition) {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Expression::Nil))
    }
}

/// `(fn* (params ...) body)`: a closure over the current scope.
pub fn apply_fn(args: &[Expression], env: &Rc<Environment>) -> Result {
    Arity::exactly(2).validate_for(args.len(), "fn*")?;
    let (parameters, body) = (&args[0], &args[1]);
    let parameters = parameters
        .as_seq()
        .map_err(|_| SyntaxError::BindingsNotSequence("fn*"))?
        .iter()
        .map(|obj| expect_symbol(obj, "fn*"))
        .collect::<Result<Vec<_>>>()?;

    let closure = Closure {
        parameters: Parameters::new(parameters).map_err(SyntaxError::BadVariadic)?,
        body: body.clone(),
        env: env.clone(),
        is_macro: false,
        meta: Expression::Nil,
    };
    Ok(Expression::Closure(Rc::new(closure)))
}

fn wrap(name: &str, args: Vec<Expression>) -> Expression {
    let mut elements = Vec::with_capacity(args.len() + 1);
    elements.push(Expression::new_symbol(name));
    elements.extend(args);
    Expression::wrap_list(elements)
}

/// If `ast` is the call `(name x)`, returns `x`.
fn unwrap_call<'a>(ast: &'a Expression, name: &'static str) -> Result<Option<&'a Expression>> {
    if !ast.is_call_to(name) {
        return Ok(None);
    }
    let list = ast.as_list()?;
    Arity::exactly(1).validate_for(list.len() - 1, name)?;
    Ok(Some(&list[1]))
}

/// Rewrites a quasiquoted form into code that builds it.
///
/// The result still has to be evaluated.
pub fn quasiquote(ast: &Expression) -> Result {
    match ast {
        Expression::Symbol(_) | Expression::Map(_) => {
            return Ok(wrap("quote", vec![ast.clone()]));
        }
        Expression::List(_) | Expression::Vector(_) => {}
        _ => return Ok(ast.clone()),
    }
    if let Some(unquoted) = unwrap_call(ast, "unquote")? {
        return Ok(unquoted.clone());
    }

    let mut result = Expression::new_list();
    for element in ast.as_seq()?.iter().rev() {
        result = match unwrap_call(element, "splice-unquote")? {
            Some(spliced) => wrap("concat", vec![spliced.clone(), result]),
            None => wrap("cons", vec![quasiquote(element)?, result]),
        };
    }
    if ast.is_vector() {
        result = wrap("vec", vec![result]);
    }
    Ok(result)
}

/// `(try* expr (catch* name handler))`.
pub fn apply_try(args: &[Expression], env: &Rc<Environment>) -> Result {
    Arity::Between(1..=2).validate_for(args.len(), "try*")?;
    let catch = match args.get(1) {
        None => None,
        Some(clause) => {
            let malformed = || SyntaxError::MalformedCatch(clause.to_string());
            let data = clause.as_list().map_err(|_| malformed())?;
            if data.len() != 3 || !clause.is_call_to("catch*") {
                return Err(malformed().into());
            }
            let exception_name = data[1].as_symbol().map_err(|_| malformed())?;
            Some((exception_name, &data[2]))
        }
    };

    match (eval(&args[0], env), catch) {
        (Ok(obj), _) => Ok(obj),
        (Err(original), None) => Err(original),
        (Err(original), Some((exception_name, exception_handler))) => {
            log::debug!("caught {}, binding it to {}", original, exception_name);
            let exception_env = Environment::spawn_from(env);
            exception_env.set(exception_name.clone(), Expression::from(&original));
            eval(exception_handler, &exception_env).map_err(|then| {
                EvalError::InCatchHandler(ErrorDuringCatch {
                    original: Box::new(original),
                    then: Box::new(then),
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn expand(input: &str) -> String {
        quasiquote(&read_str(input).unwrap()).unwrap().to_string()
    }

    #[test]
    fn quasiquote_quotes_symbols_and_maps() {
        assert_eq!(expand("a"), "(quote a)");
        assert_eq!(expand("{:a 1}"), "(quote {:a 1})");
        assert_eq!(expand("7"), "7");
        assert_eq!(expand("\"s\""), "\"s\"");
    }

    #[test]
    fn quasiquote_builds_lists_right_to_left() {
        assert_eq!(expand("()"), "()");
        assert_eq!(expand("(1 b)"), "(cons 1 (cons (quote b) ()))");
        assert_eq!(expand("(unquote x)"), "x");
        assert_eq!(expand("(1 (unquote x))"), "(cons 1 (cons x ()))");
        assert_eq!(
            expand("(1 (splice-unquote xs) 2)"),
            "(cons 1 (concat xs (cons 2 ())))"
        );
    }

    #[test]
    fn quasiquote_wraps_vectors() {
        assert_eq!(expand("[a]"), "(vec (cons (quote a) ()))");
        assert_eq!(expand("[unquote x]"), "(vec (cons (quote unquote) (cons (quote x) ())))");
    }

    #[test]
    fn unquote_checks_its_arity() {
        assert!(matches!(
            quasiquote(&read_str("(unquote a b)").unwrap()),
            Err(EvalError::WrongArity(_))
        ));
    }

    #[test]
    fn fn_rejects_bad_parameter_lists() {
        let env = Environment::root();
        let bad = |params: &str| {
            let args = [read_str(params).unwrap(), Expression::Nil];
            apply_fn(&args, &env)
        };
        assert!(matches!(bad("(1)"), Err(EvalError::BadSyntax(_))));
        assert!(matches!(bad("(a & b c)"), Err(EvalError::BadSyntax(_))));
        assert!(matches!(bad("7"), Err(EvalError::BadSyntax(_))));
        assert!(bad("[a & more]").is_ok());
    }

    #[test]
    fn if_without_else_continues_with_nil() {
        let env = Environment::root();
        let args = [Expression::Bool(false), Expression::Integer(1)];
        assert_eq!(apply_if(&args, &env).unwrap(), Expression::Nil);
        let args = [Expression::Nil, Expression::Integer(1), Expression::Integer(2)];
        assert_eq!(apply_if(&args, &env).unwrap(), Expression::Integer(2));
    }

    #[test]
    fn let_rejects_odd_bindings() {
        let env = Environment::root();
        let args = [read_str("(a 1 b)").unwrap(), Expression::Nil];
        assert!(matches!(apply_let(&args, &env), Err(EvalError::WrongArity(_))));
    }
}
