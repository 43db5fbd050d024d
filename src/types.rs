use crate::environment::Environment;
use crate::evaluator;
use derive_more::{Deref, Display};
use itertools::Itertools;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

pub type Int = i64;

#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Display)]
pub struct Symbol(pub String);

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol(name.into())
    }
}

/// Backing storage shared by the List and Vector variants.
#[derive(Deref, Debug, Clone)]
pub struct Sequence {
    #[deref]
    pub payload: Vec<Expression>,
    pub meta: Expression,
}

// Nested lists built by loops can be far deeper than the call stack, so their
// elements are released from a worklist instead of by recursive drops.
impl Drop for Sequence {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.payload);
        while let Some(obj) = pending.pop() {
            if let Expression::List(seq) | Expression::Vector(seq) = obj {
                if let Ok(mut seq) = Rc::try_unwrap(seq) {
                    pending.append(&mut seq.payload);
                }
            }
        }
    }
}

#[derive(Deref, Debug, Clone)]
pub struct Mapping {
    #[deref]
    pub payload: HashMap<HashKey, Expression>,
    pub meta: Expression,
}

#[derive(Debug, Clone)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
    Even,
    Odd,
}

#[derive(Debug)]
pub struct BadArgCount {
    pub name: &'static str,
    pub expected: Arity,
    pub got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "When evaluating {} expected {} arguments, but received {} arguments",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
            Self::Even => n % 2 == 0,
            Self::Odd => n % 2 == 1,
        }
    }

    pub(crate) fn validate_for(&self, n: usize, name: &'static str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name,
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
            Arity::Even => write!(f, "an even number of"),
            Arity::Odd => write!(f, "an odd number of"),
        }
    }
}

pub type NativeHandler = Rc<dyn Fn(&[Expression]) -> evaluator::Result>;

/// A function supplied by the host rather than written in the language itself.
#[derive(Clone)]
pub struct Native {
    pub name: &'static str,
    pub arity: Arity,
    pub handler: NativeHandler,
    pub meta: Expression,
}

impl Native {
    pub fn new(name: &'static str, arity: Arity, handler: NativeHandler) -> Self {
        Self {
            name,
            arity,
            handler,
            meta: Expression::Nil,
        }
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native function #<{}>", self.name)
    }
}

#[derive(Clone, Debug)]
pub struct Parameters {
    pub positional: Vec<Symbol>,
    pub others: Option<Symbol>,
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.positional.iter().join(" "))?;
        if let Some(rest) = &self.others {
            if !self.positional.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "& {}", rest)?;
        }
        Ok(())
    }
}

#[derive(Debug, Display)]
pub enum BadParameters {
    #[display(fmt = "found {} '&' markers, expected at most one", _0)]
    TooManyAmpersands(usize),
    #[display(fmt = "'&' must be followed by a name")]
    TooShortForAmpersand,
    #[display(fmt = "'&' must be the second-to-last parameter")]
    AmpersandPositionNotPenultimate,
}

impl Parameters {
    pub fn new(mut symbols: Vec<Symbol>) -> Result<Self, BadParameters> {
        let is_ampersand = |s: &Symbol| s.as_str() == "&";
        let ampersand_count = symbols.iter().filter(|s| is_ampersand(s)).count();

        match ampersand_count {
            0 => Ok(Parameters {
                positional: symbols,
                others: None,
            }),
            1 => {
                if symbols.len() < 2 {
                    return Err(BadParameters::TooShortForAmpersand);
                }
                if !is_ampersand(&symbols[symbols.len() - 2]) {
                    return Err(BadParameters::AmpersandPositionNotPenultimate);
                }
                let variadic_name = symbols.pop();
                let _ampersand = symbols.pop();
                Ok(Parameters {
                    positional: symbols,
                    others: variadic_name,
                })
            }
            _ => Err(BadParameters::TooManyAmpersands(ampersand_count)),
        }
    }

    pub fn arity(&self) -> Arity {
        match self.others {
            None => Arity::exactly(self.positional.len()),
            Some(_) => Arity::at_least(self.positional.len()),
        }
    }
}

#[derive(Clone)]
pub struct Closure {
    pub parameters: Parameters,
    pub body: Expression,
    pub env: Rc<Environment>,
    pub is_macro: bool,
    pub meta: Expression,
}

impl fmt::Debug for Closure {
    // Not derived because we want to skip the env: the env may well contain this Closure!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure{{parameters: {:?}, body: {:?}, is_macro: {:?}}}",
            self.parameters, self.body, self.is_macro
        )
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = if self.is_macro { "macro" } else { "fn*" };
        write!(f, "({} ({}) {})", kind, self.parameters, self.body)
    }
}

/// The only mutable cell in the value model. Clones share the same payload.
#[derive(Debug, Clone)]
pub struct Atom {
    payload: Rc<RefCell<Expression>>,
}

impl Atom {
    pub(crate) fn new(obj: &Expression) -> Self {
        Self {
            payload: Rc::new(RefCell::new(obj.clone())),
        }
    }

    pub(crate) fn borrow_payload(&self) -> Ref<Expression> {
        self.payload.borrow()
    }

    pub(crate) fn clone_payload(&self) -> Expression {
        self.payload.borrow().clone()
    }

    pub(crate) fn replace(&self, obj: &Expression) {
        self.payload.replace(obj.clone());
    }

    pub(crate) fn ptr_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.payload, &other.payload)
    }
}

#[derive(Debug, Clone)]
pub enum Expression {
    Nil,
    Bool(bool),
    Integer(Int),
    String(String),
    Keyword(String),
    Symbol(Symbol),
    List(Rc<Sequence>),
    Vector(Rc<Sequence>),
    Map(Rc<Mapping>),
    Atom(Atom),
    Closure(Rc<Closure>),
    Native(Rc<Native>),
}

pub(crate) fn truthy(obj: &Expression) -> bool {
    !matches!(obj, Expression::Nil | Expression::Bool(false))
}

pub(crate) fn callable(obj: &Expression) -> bool {
    use Expression::*;
    match obj {
        Closure(_) | Native(_) => true,
        Nil | Bool(_) | Integer(_) | String(_) | Keyword(_) | Symbol(_) | List(_) | Vector(_)
        | Map(_) | Atom(_) => false,
    }
}

#[derive(Debug, Display)]
pub enum TypeMismatch {
    #[display(fmt = "expected an integer")]
    NotAnInt,
    #[display(fmt = "expected a list")]
    NotAList,
    #[display(fmt = "expected a list or vector")]
    NotASequence,
    #[display(fmt = "expected a symbol")]
    NotASymbol,
    #[display(fmt = "expected a string")]
    NotAString,
    #[display(fmt = "expected an atom")]
    NotAnAtom,
    #[display(fmt = "expected a hash-map")]
    NotAMap,
    #[display(fmt = "expected a closure")]
    NotAClosure,
    #[display(fmt = "expected a function")]
    NotCallable,
    #[display(fmt = "expected a string or keyword")]
    NotIntoKeyword,
    #[display(fmt = "metadata can only be attached to collections and functions")]
    NoMetadata,
}

impl Expression {
    pub(crate) fn as_int(&self) -> Result<Int, TypeMismatch> {
        match self {
            Expression::Integer(x) => Ok(*x),
            _ => Err(TypeMismatch::NotAnInt),
        }
    }

    pub(crate) fn as_list(&self) -> Result<&Sequence, TypeMismatch> {
        match self {
            Expression::List(x) => Ok(x),
            _ => Err(TypeMismatch::NotAList),
        }
    }

    pub(crate) fn as_seq(&self) -> Result<&[Expression], TypeMismatch> {
        match self {
            Expression::List(x) => Ok(&x.payload),
            Expression::Vector(x) => Ok(&x.payload),
            _ => Err(TypeMismatch::NotASequence),
        }
    }

    pub(crate) fn as_symbol(&self) -> Result<&Symbol, TypeMismatch> {
        match self {
            Expression::Symbol(s) => Ok(s),
            _ => Err(TypeMismatch::NotASymbol),
        }
    }

    pub(crate) fn as_string(&self) -> Result<&str, TypeMismatch> {
        match self {
            Expression::String(s) => Ok(s),
            _ => Err(TypeMismatch::NotAString),
        }
    }

    pub(crate) fn as_atom(&self) -> Result<&Atom, TypeMismatch> {
        match self {
            Expression::Atom(a) => Ok(a),
            _ => Err(TypeMismatch::NotAnAtom),
        }
    }

    pub(crate) fn as_map(&self) -> Result<&HashMap<HashKey, Expression>, TypeMismatch> {
        match self {
            Expression::Map(m) => Ok(&m.payload),
            _ => Err(TypeMismatch::NotAMap),
        }
    }

    pub(crate) fn as_closure(&self) -> Result<&Rc<Closure>, TypeMismatch> {
        match self {
            Expression::Closure(c) => Ok(c),
            _ => Err(TypeMismatch::NotAClosure),
        }
    }

    pub(crate) fn as_hashkey(&self) -> Result<HashKey, MapError> {
        match self {
            Expression::String(s) => Ok(HashKey::String(s.clone())),
            Expression::Keyword(s) => Ok(HashKey::Keyword(s.clone())),
            _ => Err(MapError::UnhashableKey(self.to_string())),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Expression::Nil)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Expression::List(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Expression::Vector(_))
    }

    pub fn is_seq(&self) -> bool {
        self.is_list() || self.is_vector()
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Expression::Map(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Expression::Atom(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Expression::Symbol(_))
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Expression::Keyword(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Expression::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Expression::Integer(_))
    }

    pub fn is_macro(&self) -> bool {
        matches!(self, Expression::Closure(c) if c.is_macro)
    }

    /// Whether this is a List whose head is the given symbol.
    pub(crate) fn is_call_to(&self, name: &str) -> bool {
        match self {
            Expression::List(list) => {
                matches!(list.first(), Some(Expression::Symbol(s)) if s.as_str() == name)
            }
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum HashKey {
    String(String),
    Keyword(String),
}

impl HashKey {
    pub(crate) fn to_expression(&self) -> Expression {
        match self {
            HashKey::String(s) => Expression::String(s.clone()),
            HashKey::Keyword(s) => Expression::Keyword(s.clone()),
        }
    }
}

#[derive(Debug, Display)]
pub enum MapError {
    #[display(fmt = "hash-map entries must come in key/value pairs, got {} forms", _0)]
    MissingValue(usize),
    #[display(fmt = "{} cannot be used as a hash-map key", _0)]
    UnhashableKey(String),
}

pub(crate) fn build_map(entries: Vec<Expression>) -> Result<Expression, MapError> {
    if entries.len() % 2 == 1 {
        return Err(MapError::MissingValue(entries.len()));
    }
    let mut map = HashMap::new();
    for (key, value) in entries.into_iter().tuples() {
        map.insert(key.as_hashkey()?, value);
    }
    Ok(Expression::wrap_map(map))
}

impl Expression {
    pub(crate) fn new_list() -> Self {
        Self::wrap_list(Vec::new())
    }
    pub fn wrap_list(elements: Vec<Expression>) -> Self {
        Self::List(Rc::new(Sequence {
            payload: elements,
            meta: Expression::Nil,
        }))
    }
    pub fn wrap_vector(elements: Vec<Expression>) -> Self {
        Self::Vector(Rc::new(Sequence {
            payload: elements,
            meta: Expression::Nil,
        }))
    }
    pub(crate) fn wrap_map(map: HashMap<HashKey, Expression>) -> Self {
        Self::Map(Rc::new(Mapping {
            payload: map,
            meta: Expression::Nil,
        }))
    }
    pub fn new_symbol(name: &str) -> Self {
        Self::Symbol(Symbol(name.into()))
    }
    pub fn new_keyword(name: &str) -> Self {
        Self::Keyword(name.trim_start_matches(':').into())
    }
    pub(crate) fn new_native(native: Native) -> Self {
        Self::Native(Rc::new(native))
    }

    pub fn meta(&self) -> Expression {
        use Expression::*;
        match self {
            List(x) | Vector(x) => x.meta.clone(),
            Map(x) => x.meta.clone(),
            Closure(x) => x.meta.clone(),
            Native(x) => x.meta.clone(),
            _ => Nil,
        }
    }

    /// Copies the outer layer of the value, sharing its children, with new metadata attached.
    pub fn with_meta(&self, meta: &Expression) -> Result<Expression, TypeMismatch> {
        let meta = meta.clone();
        match self {
            Expression::List(x) => Ok(Expression::List(Rc::new(Sequence {
                payload: x.payload.clone(),
                meta,
            }))),
            Expression::Vector(x) => Ok(Expression::Vector(Rc::new(Sequence {
                payload: x.payload.clone(),
                meta,
            }))),
            Expression::Map(x) => Ok(Expression::Map(Rc::new(Mapping {
                payload: x.payload.clone(),
                meta,
            }))),
            Expression::Closure(c) => {
                let mut tweaked = (**c).clone();
                tweaked.meta = meta;
                Ok(Expression::Closure(Rc::new(tweaked)))
            }
            Expression::Native(n) => {
                let mut tweaked = (**n).clone();
                tweaked.meta = meta;
                Ok(Expression::Native(Rc::new(tweaked)))
            }
            _ => Err(TypeMismatch::NoMetadata),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        use Expression::*;
        if let (Ok(x), Ok(y)) = (self.as_seq(), other.as_seq()) {
            return equal_sequences(x, y);
        }
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(x), Bool(y)) => x == y,
            (Integer(x), Integer(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Keyword(x), Keyword(y)) => x == y,
            (Symbol(x), Symbol(y)) => x == y,
            (Map(x), Map(y)) => x.payload == y.payload,
            (Atom(x), Atom(y)) => x.ptr_eq(y),
            (Closure(x), Closure(y)) => Rc::ptr_eq(x, y),
            (Native(x), Native(y)) => Rc::ptr_eq(x, y),
            (_, _) => false,
        }
    }
}

fn equal_sequences(xs: &[Expression], ys: &[Expression]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x == y)
}

impl Eq for Expression {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[Int]) -> Vec<Expression> {
        values.iter().copied().map(Expression::Integer).collect()
    }

    #[test]
    fn list_equals_vector_with_same_elements() {
        let list = Expression::wrap_list(ints(&[1, 2, 3]));
        let vector = Expression::wrap_vector(ints(&[1, 2, 3]));
        assert_eq!(list, vector);
        assert_ne!(list, Expression::wrap_vector(ints(&[1, 2])));
    }

    #[test]
    fn different_variants_are_unequal() {
        assert_ne!(Expression::Integer(1), Expression::String("1".into()));
        assert_ne!(
            Expression::Keyword("a".into()),
            Expression::String("a".into())
        );
        assert_ne!(Expression::Keyword("a".into()), Expression::new_symbol("a"));
    }

    #[test]
    fn maps_compare_entrywise() {
        let a1 = build_map(vec![Expression::String("a".into()), Expression::Integer(1)]).unwrap();
        let a1_again =
            build_map(vec![Expression::String("a".into()), Expression::Integer(1)]).unwrap();
        let a2 = build_map(vec![Expression::String("a".into()), Expression::Integer(2)]).unwrap();
        assert_eq!(a1, a1_again);
        assert_ne!(a1, a2);
    }

    #[test]
    fn map_construction_rejects_bad_input() {
        assert!(matches!(
            build_map(vec![Expression::String("a".into())]),
            Err(MapError::MissingValue(1))
        ));
        assert!(matches!(
            build_map(vec![Expression::Integer(1), Expression::Integer(2)]),
            Err(MapError::UnhashableKey(_))
        ));
    }

    #[test]
    fn atoms_share_their_payload() {
        let atom = Atom::new(&Expression::Integer(1));
        let alias = atom.clone();
        alias.replace(&Expression::Integer(2));
        assert_eq!(atom.clone_payload(), Expression::Integer(2));
        assert_eq!(Expression::Atom(atom), Expression::Atom(alias));
    }

    #[test]
    fn dropping_deeply_nested_lists_does_not_recurse() {
        let mut nested = Expression::Nil;
        for _ in 0..500_000 {
            nested = Expression::wrap_list(vec![nested]);
        }
        drop(nested);

        let shared = Expression::wrap_vector(ints(&[1, 2]));
        let outer = Expression::wrap_list(vec![shared.clone(), shared.clone()]);
        drop(outer);
        assert_eq!(shared, Expression::wrap_vector(ints(&[1, 2])));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&Expression::Nil));
        assert!(!truthy(&Expression::Bool(false)));
        assert!(truthy(&Expression::Integer(0)));
        assert!(truthy(&Expression::new_list()));
    }

    #[test]
    fn variadic_parameters() {
        let names = |names: &[&str]| names.iter().map(|&n| Symbol::from(n)).collect::<Vec<_>>();
        let params = Parameters::new(names(&["a", "&", "rest"])).unwrap();
        assert_eq!(params.positional, names(&["a"]));
        assert_eq!(params.others, Some(Symbol::from("rest")));
        assert!(params.arity().contains(5));
        assert!(!params.arity().contains(0));

        assert!(matches!(
            Parameters::new(names(&["&"])),
            Err(BadParameters::TooShortForAmpersand)
        ));
        assert!(matches!(
            Parameters::new(names(&["&", "a", "b"])),
            Err(BadParameters::AmpersandPositionNotPenultimate)
        ));
        assert!(matches!(
            Parameters::new(names(&["&", "&", "a"])),
            Err(BadParameters::TooManyAmpersands(2))
        ));
    }

    #[test]
    fn metadata_is_attached_to_a_copy() {
        let list = Expression::wrap_list(ints(&[1]));
        let tagged = list.with_meta(&Expression::Integer(7)).unwrap();
        assert_eq!(tagged.meta(), Expression::Integer(7));
        assert_eq!(list.meta(), Expression::Nil);
        assert_eq!(tagged, list);
        assert!(Expression::Integer(1)
            .with_meta(&Expression::Nil)
            .is_err());
    }
}
