//! Per-step evaluation results and unwinding signals.
//!
//! Every evaluation function returns `Result<Outcome, Signal>`. The `Ok` arm
//! is the ordinary result of one AST node: no value, a constant visible to
//! user code, or a transient internal value (used by `if` to report whether
//! its branch ran), optionally carrying the [`Reference`] resolved for the
//! node. Function returns and fatal errors travel through the `Err` arm, so
//! statement sequences and loop bodies short-circuit on `?` without host
//! exceptions.

use super::error::RuntimeError;
use super::reference::Reference;
use super::value::Value;

/// Kind tag of an evaluation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// No result value (statements)
    None,
    /// A value visible to user code
    Constant,
    /// An internal value that must not reach user code
    Transient,
}

/// The outcome of evaluating a single AST node.
#[derive(Debug, Clone)]
pub struct Outcome {
    kind: OutcomeKind,
    value: Option<Value>,
    reference: Option<Reference>,
}

impl Outcome {
    pub fn none() -> Outcome {
        Outcome {
            kind: OutcomeKind::None,
            value: None,
            reference: None,
        }
    }

    pub fn constant(value: Value) -> Outcome {
        Outcome {
            kind: OutcomeKind::Constant,
            value: Some(value),
            reference: None,
        }
    }

    pub fn transient(value: Value) -> Outcome {
        Outcome {
            kind: OutcomeKind::Transient,
            value: Some(value),
            reference: None,
        }
    }

    /// Attach the lvalue handle resolved while producing this outcome.
    pub fn with_reference(mut self, reference: Reference) -> Outcome {
        self.reference = Some(reference);
        self
    }

    pub fn is_constant(&self) -> bool {
        self.kind == OutcomeKind::Constant
    }

    /// The carried value, regardless of kind.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn take_reference(&mut self) -> Option<Reference> {
        self.reference.take()
    }

    /// Unwrap a constant value, failing with a contextual non-constant error
    /// for outcomes that carry no user-visible value.
    pub fn into_constant(self, context: &'static str) -> Result<Value, RuntimeError> {
        match (self.kind, self.value) {
            (OutcomeKind::Constant, Some(value)) => Ok(value),
            _ => Err(RuntimeError::NonConstant(context)),
        }
    }
}

/// An unwinding signal propagated through the `Err` arm.
#[derive(Debug)]
pub enum Signal {
    /// `return`, unwinding to the nearest enclosing function call
    Return(Option<Value>),
    /// A fatal error, unwinding to the program boundary
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Signal {
        Signal::Error(error)
    }
}

/// Result type threaded through every evaluation step.
pub type ExecResult = Result<Outcome, Signal>;
