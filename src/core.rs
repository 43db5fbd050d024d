//! The native function library installed into the root environment.

use crate::environment::Environment;
use crate::evaluator::{self, EvalError};
use crate::printer::{self, PrintMode};
use crate::reader;
use crate::types::{
    self, callable, Arity, Atom, Expression, HashKey, Int, Native, NativeHandler, TypeMismatch,
};
use itertools::Itertools;
use linefeed::{Interface, ReadResult};
use std::convert::TryFrom;
use std::fs::read_to_string;
use std::rc::Rc;
use std::time::SystemTime;

pub struct PrimitiveFn {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: fn(&[Expression]) -> evaluator::Result,
}

fn grab_ints(args: &[Expression]) -> evaluator::Result<Vec<Int>> {
    let type_check: Result<Vec<_>, _> = args.iter().map(|o| o.as_int()).collect();
    type_check.map_err(EvalError::TypeMismatch)
}

fn int_pair(args: &[Expression]) -> evaluator::Result<(Int, Int)> {
    Ok((args[0].as_int()?, args[1].as_int()?))
}

const SUM: PrimitiveFn = PrimitiveFn {
    name: "+",
    fn_ptr: |args| {
        let (x, y) = int_pair(args)?;
        Ok(Expression::Integer(x.wrapping_add(y)))
    },
    arity: Arity::exactly(2),
};

const SUB: PrimitiveFn = PrimitiveFn {
    name: "-",
    fn_ptr: sub_,
    arity: Arity::Between(1..=2),
};

fn sub_(args: &[Expression]) -> evaluator::Result {
    match grab_ints(args)?.as_slice() {
        [x] => Ok(Expression::Integer(x.wrapping_neg())),
        [x, y] => Ok(Expression::Integer(x.wrapping_sub(*y))),
        _ => unreachable!("arity checked before the call"),
    }
}

const MUL: PrimitiveFn = PrimitiveFn {
    name: "*",
    fn_ptr: |args| {
        let (x, y) = int_pair(args)?;
        Ok(Expression::Integer(x.wrapping_mul(y)))
    },
    arity: Arity::exactly(2),
};

const DIV: PrimitiveFn = PrimitiveFn {
    name: "/",
    fn_ptr: |args| match int_pair(args)? {
        (_, 0) => Err(EvalError::DivisionByZero),
        (x, y) => Ok(Expression::Integer(x.wrapping_div(y))),
    },
    arity: Arity::exactly(2),
};

const REM: PrimitiveFn = PrimitiveFn {
    name: "%",
    fn_ptr: |args| match int_pair(args)? {
        (_, 0) => Err(EvalError::DivisionByZero),
        (x, y) => Ok(Expression::Integer(x.wrapping_rem(y))),
    },
    arity: Arity::exactly(2),
};

fn comparison_(args: &[Expression], comp: fn(&Int, &Int) -> bool) -> evaluator::Result {
    let (x, y) = int_pair(args)?;
    Ok(Expression::Bool(comp(&x, &y)))
}

macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            const $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |args: &[Expression]| comparison_(args, Int:: [<$NAME:lower>]),
                arity: Arity::exactly(2),
            };
        }
    };
}

comparison_primitive!(<, LT);
comparison_primitive!(<=, LE);
comparison_primitive!(>, GT);
comparison_primitive!(>=, GE);

const EQUAL: PrimitiveFn = PrimitiveFn {
    name: "=",
    fn_ptr: |args| Ok(Expression::Bool(args[0] == args[1])),
    arity: Arity::exactly(2),
};

macro_rules! predicate_primitive {
    ($SYMBOL:expr, $NAME:ident, $TEST:expr) => {
        const $NAME: PrimitiveFn = PrimitiveFn {
            name: $SYMBOL,
            fn_ptr: |args: &[Expression]| Ok(Expression::Bool($TEST(&args[0]))),
            arity: Arity::exactly(1),
        };
    };
}

predicate_primitive!("nil?", NIL_TEST, Expression::is_nil);
predicate_primitive!("true?", TRUE_TEST, |obj: &Expression| matches!(
    obj,
    Expression::Bool(true)
));
predicate_primitive!("false?", FALSE_TEST, |obj: &Expression| matches!(
    obj,
    Expression::Bool(false)
));
predicate_primitive!("symbol?", SYMBOL_TEST, Expression::is_symbol);
predicate_primitive!("keyword?", KEYWORD_TEST, Expression::is_keyword);
predicate_primitive!("string?", STRING_TEST, Expression::is_string);
predicate_primitive!("number?", NUMBER_TEST, Expression::is_number);
predicate_primitive!("list?", LIST_TEST, Expression::is_list);
predicate_primitive!("vector?", VECTOR_TEST, Expression::is_vector);
predicate_primitive!("sequential?", SEQUENTIAL_TEST, Expression::is_seq);
predicate_primitive!("map?", MAP_TEST, Expression::is_map);
predicate_primitive!("atom?", ATOM_TEST, Expression::is_atom);
predicate_primitive!("macro?", MACRO_TEST, Expression::is_macro);
predicate_primitive!("fn?", FUNCTION_TEST, |obj: &Expression| callable(obj)
    && !obj.is_macro());

const EMPTY_TEST: PrimitiveFn = PrimitiveFn {
    name: "empty?",
    fn_ptr: |args| match &args[0] {
        Expression::Nil => Ok(Expression::Bool(true)),
        Expression::Map(m) => Ok(Expression::Bool(m.is_empty())),
        obj => Ok(Expression::Bool(obj.as_seq()?.is_empty())),
    },
    arity: Arity::exactly(1),
};

const COUNT: PrimitiveFn = PrimitiveFn {
    name: "count",
    fn_ptr: count_,
    arity: Arity::exactly(1),
};

fn count_(args: &[Expression]) -> evaluator::Result {
    let count = match &args[0] {
        Expression::Nil => 0,
        Expression::Map(m) => m.len(),
        Expression::String(s) => s.chars().count(),
        obj => obj.as_seq()?.len(),
    };
    Ok(Expression::Integer(count as Int))
}

fn print_string_internal(
    args: &[Expression],
    mode: PrintMode,
    sep: &'static str,
    to_screen: bool,
) -> evaluator::Result {
    let text = args.iter().map(|arg| printer::pr_str(arg, mode)).join(sep);
    if to_screen {
        println!("{}", text);
        Ok(Expression::Nil)
    } else {
        Ok(Expression::String(text))
    }
}

const PR_STR: PrimitiveFn = PrimitiveFn {
    name: "pr-str",
    fn_ptr: |args| print_string_internal(args, PrintMode::ReadableRepresentation, " ", false),
    arity: Arity::at_least(0),
};

const STR: PrimitiveFn = PrimitiveFn {
    name: "str",
    fn_ptr: |args| print_string_internal(args, PrintMode::Directly, "", false),
    arity: Arity::at_least(0),
};

const PRN: PrimitiveFn = PrimitiveFn {
    name: "prn",
    fn_ptr: |args| print_string_internal(args, PrintMode::ReadableRepresentation, " ", true),
    arity: Arity::at_least(0),
};

const PRINTLN: PrimitiveFn = PrimitiveFn {
    name: "println",
    fn_ptr: |args| print_string_internal(args, PrintMode::Directly, " ", true),
    arity: Arity::at_least(0),
};

const READ_STRING: PrimitiveFn = PrimitiveFn {
    name: "read-string",
    fn_ptr: read_string_,
    arity: Arity::exactly(1),
};

fn read_string_(args: &[Expression]) -> evaluator::Result {
    match reader::read_str(args[0].as_string()?) {
        Err(reader::ParseError::EmptyInput) => Ok(Expression::Nil),
        result => result.map_err(EvalError::Read),
    }
}

const SLURP: PrimitiveFn = PrimitiveFn {
    name: "slurp",
    fn_ptr: |args| {
        let contents = read_to_string(args[0].as_string()?)?;
        Ok(Expression::String(contents))
    },
    arity: Arity::exactly(1),
};

const READLINE: PrimitiveFn = PrimitiveFn {
    name: "readline",
    fn_ptr: readline_,
    arity: Arity::exactly(1),
};

fn readline_(args: &[Expression]) -> evaluator::Result {
    let prompt = args[0].as_string()?;
    let interface = Interface::new("tinylisp-readline")?;
    interface.set_prompt(prompt)?;
    match interface.read_line()? {
        ReadResult::Input(line) => Ok(Expression::String(line)),
        ReadResult::Eof | ReadResult::Signal(_) => Ok(Expression::Nil),
    }
}

const LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: |args| Ok(Expression::wrap_list(args.to_vec())),
    arity: Arity::at_least(0),
};

const VECTOR: PrimitiveFn = PrimitiveFn {
    name: "vector",
    fn_ptr: |args| Ok(Expression::wrap_vector(args.to_vec())),
    arity: Arity::at_least(0),
};

const VEC: PrimitiveFn = PrimitiveFn {
    name: "vec",
    fn_ptr: |args| match &args[0] {
        Expression::Vector(_) => Ok(args[0].clone()),
        obj => Ok(Expression::wrap_vector(obj.as_seq()?.to_vec())),
    },
    arity: Arity::exactly(1),
};

const CONS: PrimitiveFn = PrimitiveFn {
    name: "cons",
    fn_ptr: cons_,
    arity: Arity::exactly(2),
};

fn cons_(args: &[Expression]) -> evaluator::Result {
    let head = &args[0];
    let tail = args[1].as_seq()?;

    let mut elements = Vec::with_capacity(tail.len() + 1);
    elements.push(head.clone());
    elements.extend_from_slice(tail);
    Ok(Expression::wrap_list(elements))
}

const CONCAT: PrimitiveFn = PrimitiveFn {
    name: "concat",
    fn_ptr: concat_,
    arity: Arity::at_least(0),
};

fn concat_(args: &[Expression]) -> evaluator::Result {
    let mut output = Vec::new();
    for arg in args {
        output.extend_from_slice(arg.as_seq()?);
    }
    Ok(Expression::wrap_list(output))
}

const NTH: PrimitiveFn = PrimitiveFn {
    name: "nth",
    fn_ptr: |args| nth_internal(args[0].as_seq()?, args[1].as_int()?),
    arity: Arity::exactly(2),
};

fn nth_internal(seq: &[Expression], orig_index: Int) -> evaluator::Result {
    usize::try_from(orig_index)
        .ok()
        .and_then(|index| seq.get(index))
        .cloned()
        .ok_or(EvalError::IndexOutOfRange {
            index: orig_index,
            len: seq.len(),
        })
}

const FIRST: PrimitiveFn = PrimitiveFn {
    name: "first",
    fn_ptr: |args| match &args[0] {
        Expression::Nil => Ok(Expression::Nil),
        obj => Ok(obj.as_seq()?.first().cloned().unwrap_or(Expression::Nil)),
    },
    arity: Arity::exactly(1),
};

const REST: PrimitiveFn = PrimitiveFn {
    name: "rest",
    fn_ptr: |args| match &args[0] {
        Expression::Nil => Ok(Expression::new_list()),
        obj => {
            let seq = obj.as_seq()?;
            let rest = seq.get(1..).unwrap_or(&[]);
            Ok(Expression::wrap_list(rest.to_vec()))
        }
    },
    arity: Arity::exactly(1),
};

const APPLY: PrimitiveFn = PrimitiveFn {
    name: "apply",
    fn_ptr: apply_,
    arity: Arity::at_least(2),
};

fn apply_(args: &[Expression]) -> evaluator::Result {
    let (last, init) = match args.split_last() {
        Some(split) => split,
        None => unreachable!("arity checked before the call"),
    };
    let mut concatenated = init[1..].to_vec();
    concatenated.extend_from_slice(last.as_seq()?);
    evaluator::apply(&args[0], &concatenated)
}

const MAP: PrimitiveFn = PrimitiveFn {
    name: "map",
    fn_ptr: map_,
    arity: Arity::exactly(2),
};

fn map_(args: &[Expression]) -> evaluator::Result {
    let result: Result<Vec<_>, _> = args[1]
        .as_seq()?
        .chunks_exact(1)
        .map(|obj| evaluator::apply(&args[0], obj))
        .collect();
    Ok(Expression::wrap_list(result?))
}

const SEQ: PrimitiveFn = PrimitiveFn {
    name: "seq",
    fn_ptr: seq_,
    arity: Arity::exactly(1),
};

fn seq_(args: &[Expression]) -> evaluator::Result {
    use Expression::*;
    match &args[0] {
        Nil => Ok(Nil),
        String(s) if s.is_empty() => Ok(Nil),
        String(s) => Ok(Expression::wrap_list(
            s.chars().map(|c| String(c.to_string())).collect(),
        )),
        List(x) | Vector(x) if x.is_empty() => Ok(Nil),
        List(_) => Ok(args[0].clone()),
        Vector(x) => Ok(Expression::wrap_list(x.payload.clone())),
        _ => Err(EvalError::TypeMismatch(TypeMismatch::NotASequence)),
    }
}

const CONJ: PrimitiveFn = PrimitiveFn {
    name: "conj",
    fn_ptr: conj_,
    arity: Arity::at_least(2),
};

fn conj_(args: &[Expression]) -> evaluator::Result {
    let old = args[0].as_seq()?;
    let new = &args[1..];
    if args[0].is_list() {
        let mut result = new.to_vec();
        result.reverse();
        result.extend_from_slice(old);
        Ok(Expression::wrap_list(result))
    } else {
        let mut result = old.to_vec();
        result.extend_from_slice(new);
        Ok(Expression::wrap_vector(result))
    }
}

const HASH_MAP: PrimitiveFn = PrimitiveFn {
    name: "hash-map",
    fn_ptr: |args| Ok(types::build_map(args.to_vec())?),
    arity: Arity::Even,
};

const ASSOC: PrimitiveFn = PrimitiveFn {
    name: "assoc",
    fn_ptr: assoc_,
    arity: Arity::Odd,
};

fn assoc_(args: &[Expression]) -> evaluator::Result {
    let mut map = args[0].as_map()?.clone();
    for (key, value) in args[1..].iter().tuples() {
        map.insert(key.as_hashkey()?, value.clone());
    }
    Ok(Expression::wrap_map(map))
}

const DISSOC: PrimitiveFn = PrimitiveFn {
    name: "dissoc",
    fn_ptr: dissoc_,
    arity: Arity::at_least(1),
};

fn dissoc_(args: &[Expression]) -> evaluator::Result {
    let mut map = args[0].as_map()?.clone();
    for arg in &args[1..] {
        map.remove(&arg.as_hashkey()?);
    }
    Ok(Expression::wrap_map(map))
}

const GET: PrimitiveFn = PrimitiveFn {
    name: "get",
    fn_ptr: |args| {
        if args[0].is_nil() {
            return Ok(Expression::Nil);
        }
        let map = args[0].as_map()?;
        let key = args[1].as_hashkey()?;
        Ok(map.get(&key).cloned().unwrap_or(Expression::Nil))
    },
    arity: Arity::exactly(2),
};

const CONTAINS: PrimitiveFn = PrimitiveFn {
    name: "contains?",
    fn_ptr: |args| {
        let map = args[0].as_map()?;
        let key = args[1].as_hashkey()?;
        Ok(Expression::Bool(map.contains_key(&key)))
    },
    arity: Arity::exactly(2),
};

const KEYS: PrimitiveFn = PrimitiveFn {
    name: "keys",
    fn_ptr: |args| {
        let keys = args[0].as_map()?.keys().map(HashKey::to_expression).collect();
        Ok(Expression::wrap_list(keys))
    },
    arity: Arity::exactly(1),
};

const VALS: PrimitiveFn = PrimitiveFn {
    name: "vals",
    fn_ptr: |args| {
        let vals = args[0].as_map()?.values().cloned().collect();
        Ok(Expression::wrap_list(vals))
    },
    arity: Arity::exactly(1),
};

const ATOM: PrimitiveFn = PrimitiveFn {
    name: "atom",
    fn_ptr: |args| Ok(Expression::Atom(Atom::new(&args[0]))),
    arity: Arity::exactly(1),
};

const DEREF: PrimitiveFn = PrimitiveFn {
    name: "deref",
    fn_ptr: |args| Ok(args[0].as_atom()?.clone_payload()),
    arity: Arity::exactly(1),
};

const RESET: PrimitiveFn = PrimitiveFn {
    name: "reset!",
    fn_ptr: |args| {
        args[0].as_atom()?.replace(&args[1]);
        Ok(args[1].clone())
    },
    arity: Arity::exactly(2),
};

const SWAP: PrimitiveFn = PrimitiveFn {
    name: "swap!",
    fn_ptr: swap_,
    arity: Arity::at_least(2),
};

fn swap_(swap_args: &[Expression]) -> evaluator::Result {
    let atom = swap_args[0].as_atom()?;
    let f = &swap_args[1];
    if !callable(f) {
        return Err(EvalError::TypeMismatch(TypeMismatch::NotCallable));
    }
    let mut args = Vec::with_capacity(swap_args.len() - 1);
    args.push(atom.clone_payload());
    args.extend_from_slice(&swap_args[2..]);
    let obj = evaluator::apply(f, &args)?;
    atom.replace(&obj);
    Ok(obj)
}

const SYMBOL: PrimitiveFn = PrimitiveFn {
    name: "symbol",
    fn_ptr: |args| Ok(Expression::new_symbol(args[0].as_string()?)),
    arity: Arity::exactly(1),
};

const KEYWORD: PrimitiveFn = PrimitiveFn {
    name: "keyword",
    fn_ptr: |args| match &args[0] {
        Expression::String(s) => Ok(Expression::new_keyword(s)),
        Expression::Keyword(_) => Ok(args[0].clone()),
        _ => Err(EvalError::TypeMismatch(TypeMismatch::NotIntoKeyword)),
    },
    arity: Arity::exactly(1),
};

const META: PrimitiveFn = PrimitiveFn {
    name: "meta",
    fn_ptr: |args| Ok(args[0].meta()),
    arity: Arity::exactly(1),
};

const WITH_META: PrimitiveFn = PrimitiveFn {
    name: "with-meta",
    fn_ptr: |args| Ok(args[0].with_meta(&args[1])?),
    arity: Arity::exactly(2),
};

const THROW: PrimitiveFn = PrimitiveFn {
    name: "throw",
    fn_ptr: |args| Err(EvalError::UserThrown(args[0].clone())),
    arity: Arity::exactly(1),
};

const TIME_MS: PrimitiveFn = PrimitiveFn {
    name: "time-ms",
    fn_ptr: |_args| {
        let millis = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .unwrap_or(0);
        Ok(Expression::Integer(millis as Int))
    },
    arity: Arity::exactly(0),
};

pub const CORE: &[PrimitiveFn] = &[
    // Arithmetic
    SUM,
    SUB,
    MUL,
    DIV,
    REM,
    // Comparisons
    GT,
    GE,
    LT,
    LE,
    EQUAL,
    // Working with strings
    PR_STR,
    STR,
    PRN,
    PRINTLN,
    READ_STRING,
    SLURP,
    READLINE,
    // Working with lists
    LIST,
    VECTOR,
    VEC,
    CONS,
    CONCAT,
    NTH,
    FIRST,
    REST,
    APPLY,
    MAP,
    SEQ,
    CONJ,
    COUNT,
    EMPTY_TEST,
    // Working with maps
    HASH_MAP,
    ASSOC,
    DISSOC,
    GET,
    CONTAINS,
    KEYS,
    VALS,
    // Working with atoms
    ATOM,
    DEREF,
    RESET,
    SWAP,
    // Casting and testing
    NIL_TEST,
    TRUE_TEST,
    FALSE_TEST,
    LIST_TEST,
    VECTOR_TEST,
    SEQUENTIAL_TEST,
    MAP_TEST,
    ATOM_TEST,
    SYMBOL,
    SYMBOL_TEST,
    KEYWORD,
    KEYWORD_TEST,
    STRING_TEST,
    NUMBER_TEST,
    FUNCTION_TEST,
    MACRO_TEST,
    // Metadata
    META,
    WITH_META,
    // Exceptions
    THROW,
    // Other
    TIME_MS,
];

impl PrimitiveFn {
    fn to_native(&self) -> Native {
        let handler: NativeHandler = Rc::new(self.fn_ptr);
        Native::new(self.name, self.arity.clone(), handler)
    }
}

/// Binds every native in [`CORE`] into `env`.
pub fn install(env: &Environment) {
    for func in CORE {
        env.set(func.name, Expression::new_native(func.to_native()));
    }
    log::debug!("installed {} natives", CORE.len());
}
