//! Opal Programming Language
//!
//! Opal is a small dynamically-typed scripting language with scalar values,
//! arrays, user structs, and user-defined functions, executed by a
//! tree-walking evaluator.

pub mod cli;
pub mod interpreter;
pub mod parser;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::interpreter::{Evaluator, RuntimeError, Value};
    pub use crate::parser::ast::*;
    pub use crate::parser::{parse_source, ParseError};
}
