use crate::evaluator::EvalError;
use crate::types::{BadArgCount, Expression, Parameters, Symbol};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// One lexical scope. Lookups fall back to the parent chain; writes never do.
#[derive(Default)]
pub struct Environment {
    bindings: RefCell<HashMap<Symbol, Expression>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn spawn_from(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// A child of `parent` with each parameter bound to the matching argument.
    /// A variadic tail collects the leftover arguments into a List.
    pub fn new(
        parent: &Rc<Self>,
        parameters: &Parameters,
        args: &[Expression],
    ) -> Result<Rc<Self>, BadArgCount> {
        parameters.arity().validate_for(args.len(), "closure")?;
        let env = Self::spawn_from(parent);

        let (positional, rest) = args.split_at(parameters.positional.len());
        for (key, value) in parameters.positional.iter().zip(positional) {
            env.set(key.clone(), value.clone());
        }
        if let Some(rest_key) = &parameters.others {
            env.set(rest_key.clone(), Expression::wrap_list(rest.to_vec()));
        }
        log::debug!("bound ({}) in new scope", parameters);
        Ok(env)
    }

    pub fn set<T>(&self, key: T, value: Expression) -> Expression
    where
        T: Into<Symbol>,
    {
        self.bindings.borrow_mut().insert(key.into(), value.clone());
        value
    }

    pub fn get(&self, key: &Symbol) -> Result<Expression, EvalError> {
        let mut env = self;
        loop {
            if let Some(value) = env.bindings.borrow().get(key) {
                return Ok(value.clone());
            }
            match &env.parent {
                Some(parent) => env = parent.as_ref(),
                None => return Err(EvalError::UnboundSymbol(key.clone())),
            }
        }
    }

    /// The nearest scope, starting from this one, that binds `key` directly.
    pub fn find(self: &Rc<Self>, key: &Symbol) -> Option<Rc<Self>> {
        let mut env = self;
        loop {
            if env.bindings.borrow().contains_key(key) {
                return Some(env.clone());
            }
            env = env.parent.as_ref()?;
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        write!(f, "{{{}}}", bindings.keys().sorted().join(" "))?;
        if let Some(parent) = &self.parent {
            write!(f, " -> {}", parent)?;
        }
        Ok(())
    }
}
