//! Evaluation failures.
//!
//! Every way a calculation can fail maps to one [`EvalError`] variant.
//! Engine-side variants are normally recovered by the bridge (it falls
//! back to the local evaluator) and only surface in logs; the local
//! variants and [`EvalError::EmptyExpression`] are what callers see.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Blank input. Neither evaluator is consulted.
    #[error("empty expression")]
    EmptyExpression,

    /// No engine handle: never spawned, failed to spawn, or retired.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine wrote to its error stream.
    #[error("{0}")]
    EngineError(String),

    /// Nothing on either stream within the response window.
    #[error("no response from engine")]
    NoResponse,

    /// Output arrived but carried no `= <number>` token.
    #[error("could not parse engine output: {0:?}")]
    UnparseableOutput(String),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// The expression parsed but produced infinity or NaN.
    #[error("invalid calculation")]
    InvalidCalculation,
}

/// Machine-readable discriminant of an [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    EmptyExpression,
    EngineUnavailable,
    EngineError,
    NoResponse,
    UnparseableOutput,
    InvalidExpression,
    InvalidCalculation,
}

impl EvalError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptyExpression => FailureKind::EmptyExpression,
            Self::EngineUnavailable(_) => FailureKind::EngineUnavailable,
            Self::EngineError(_) => FailureKind::EngineError,
            Self::NoResponse => FailureKind::NoResponse,
            Self::UnparseableOutput(_) => FailureKind::UnparseableOutput,
            Self::InvalidExpression(_) => FailureKind::InvalidExpression,
            Self::InvalidCalculation => FailureKind::InvalidCalculation,
        }
    }

    /// True for failures of the engine path, which the bridge recovers from.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::EngineUnavailable
                | FailureKind::EngineError
                | FailureKind::NoResponse
                | FailureKind::UnparseableOutput
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EmptyExpression => "empty_expression",
            Self::EngineUnavailable => "engine_unavailable",
            Self::EngineError => "engine_error",
            Self::NoResponse => "no_response",
            Self::UnparseableOutput => "unparseable_output",
            Self::InvalidExpression => "invalid_expression",
            Self::InvalidCalculation => "invalid_calculation",
        };
        f.write_str(s)
    }
}
