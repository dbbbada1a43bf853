//! Parser for the Opal programming language.
//!
//! This module provides:
//! - Lexer (tokenization)
//! - Parser (AST construction plus the struct/function registries)
//! - AST definitions

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;

pub use ast::*;
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::Parser;

use thiserror::Error;

/// A parse-time failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized token '{text}'")]
    InvalidToken { text: String, line: usize },

    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("line {line}: function '{name}' is declared twice")]
    DuplicateFunction { name: String, line: usize },

    #[error("line {line}: struct '{name}' is declared twice")]
    DuplicateStruct { name: String, line: usize },

    #[error("line {line}: parameter '{name}' is declared twice")]
    DuplicateParameter { name: String, line: usize },

    #[error("line {line}: '{keyword}' declarations are only allowed at the top level")]
    NotTopLevel { keyword: &'static str, line: usize },
}

/// Parse source code into a [`Program`].
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}
