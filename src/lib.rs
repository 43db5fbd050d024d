#[macro_use]
extern crate lazy_static;

pub mod cmdline;
pub mod core;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod printer;
pub mod reader;
pub mod special_forms;
pub mod tokens;
pub mod types;

pub use environment::Environment;
pub use evaluator::{apply, eval, EvalError};
pub use reader::{read_str, ParseError};
pub use types::Expression;
