//! Runtime error types for the Opal interpreter.
//!
//! Every fatal condition is one variant here. Errors raised by native
//! functions use the same type; they propagate through the evaluator like a
//! `return` and become the same fatal abort at the program boundary -- no
//! error is user-recoverable.

use thiserror::Error;

/// A fatal runtime error. Reported with its message and aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("'{0}' is already defined")]
    AlreadyDeclared(String),

    #[error("call to undefined function '{0}'")]
    UndefinedFunction(String),

    #[error("undefined struct '{0}'")]
    UndefinedStruct(String),

    #[error("struct '{0}' has no member '{1}'")]
    UndefinedMember(String, String),

    #[error("too few arguments: {name}() requires {expected} argument(s), {got} provided")]
    TooFewArguments {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("unsupported operand types: {lhs} {op} {rhs}")]
    IncompatibleOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("cannot use array access on non-array value of type {0}")]
    NotAnArray(&'static str),

    #[error("cannot access member of non-object value of type {0}")]
    NotAnObject(&'static str),

    #[error("illegal lvalue")]
    IllegalLvalue,

    #[error("cannot assign to this expression")]
    NotAssignable,

    #[error("expression used as {0} yields no value")]
    NonConstant(&'static str),

    #[error("cannot increment or decrement value of type {0}")]
    NotIncrementable(&'static str),

    #[error("type {0} cannot be used as len() argument")]
    InvalidLenArgument(&'static str),

    #[error("unknown type name '{0}'")]
    UnknownType(String),

    #[error("cannot cast a value to the object type")]
    CannotCastToObject,

    #[error("foreach target of type {0} is not iterable")]
    NotIterable(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("array index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("'return' outside of a function")]
    ReturnOutsideFunction,

    #[error("stdin read failed")]
    IoFailure,

    #[error("printf: {0}")]
    FormatError(String),
}
