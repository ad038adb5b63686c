//! Symbolic scalar expressions over a declared set of state variables.
//!
//! Expressions are parsed from text into an immutable [`Expr`] tree which
//! can be differentiated exactly, simplified, tested for being identically
//! zero and evaluated numerically.
//!
//! # Example
//! ```
//! use geometric_control::symbolic::parse;
//!
//! let vars = ["x1", "x2"];
//! let h = parse("x1^2 + sin(x2)", &vars).unwrap();
//! let dh = h.partial("x1");
//! assert_eq!(dh.to_string(), "2 * x1");
//! assert_eq!(dh.evaluate(&vars, &[3.0, 0.0]).unwrap(), 6.0);
//! ```
//!
//! # Simplification
//!
//! [`Expr::simplify`] only applies exact rewrite rules: constant folding,
//! additive and multiplicative identities, merging of numeric coefficients
//! on like terms and sign normalization. It does not know trigonometric or
//! logarithmic identities, so `sin(x)^2 + cos(x)^2 - 1` is not recognized
//! as zero. [`Expr::zero_test`] reports such cases as
//! [`ZeroTest::Ambiguous`].

mod diff;
mod eval;
mod expr;
mod parser;
mod simplify;

use thiserror::Error;

pub use eval::ZeroTest;
pub use expr::{Expr, UnaryFn, VectorField};
pub use parser::{parse, MAX_DEPTH};

/// Failures of the expression engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolicError {
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("domain error: {0}")]
    Domain(String),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}
