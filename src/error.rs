//! Error types shared by every computation in the crate.

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

use crate::symbolic::SymbolicError;

/// Errors produced while validating a request or running one of the solvers.
///
/// Every error is local to the call that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Inconsistent matrix shapes, rejected before any algorithm runs.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A near-singular solve during feedback synthesis.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// An identifier that is not in the declared variable list.
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// Malformed expression text.
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Invalid numerical evaluation (log of a non-positive number, ...).
    #[error("domain error: {0}")]
    Domain(String),

    /// Input that is well-shaped but otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The LAPACK backend failed.
    #[error("linear algebra backend error: {0}")]
    Linalg(String),

    /// Invalid engine configuration.
    #[error("config error: {0}")]
    Config(String),
}

pub type ControlResult<T> = Result<T, ControlError>;

impl ControlError {
    /// Machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::DimensionMismatch(_) => "DimensionMismatch",
            ControlError::NumericalInstability(_) => "NumericalInstability",
            ControlError::UnknownVariable { .. } => "UnknownVariable",
            ControlError::Parse { .. } => "ParseError",
            ControlError::Domain(_) => "DomainError",
            ControlError::InvalidInput(_) => "InvalidInput",
            ControlError::Linalg(_) => "Linalg",
            ControlError::Config(_) => "Config",
        }
    }
}

impl From<LinalgError> for ControlError {
    fn from(e: LinalgError) -> Self {
        ControlError::Linalg(e.to_string())
    }
}

impl From<SymbolicError> for ControlError {
    fn from(e: SymbolicError) -> Self {
        match e {
            SymbolicError::UnknownVariable { name } => ControlError::UnknownVariable { name },
            SymbolicError::Parse { position, message } => ControlError::Parse { position, message },
            SymbolicError::Domain(message) => ControlError::Domain(message),
            SymbolicError::DimensionMismatch(message) => ControlError::DimensionMismatch(message),
        }
    }
}
