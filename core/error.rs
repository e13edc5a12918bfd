//! Crate-wide error type.
//!
//! Mirrors the four error kinds from the design: malformed input aborts a
//! proof attempt synchronously, a method being aborted (or timing out) is
//! recoverable and lets the driver try the next method, and internal
//! invariant violations are logged and answered with a conservative value
//! rather than propagated, so callers don't need to match on them.

use thiserror::Error;

/// Errors that can occur during a termination proof attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The input alphabet/rules violate a structural invariant
    /// (unknown constant, type mismatch, non-pattern left-hand side, ...).
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// A single method (polynomial interpretation, HORPO, ...) could not
    /// orient anything; the driver should try the next method.
    #[error("method aborted: {reason}")]
    MethodAborted { reason: String },

    /// The external SAT solver did not return a model before the
    /// configured wall-clock timeout elapsed.
    #[error("solver timed out")]
    SolverTimeout,

    /// An internal invariant was violated. These are logged via `log::error!`
    /// at the point of detection; this variant exists for call sites that
    /// cannot fall back to a conservative value and must bail out instead.
    #[error("internal error: {message}")]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, ProverError>;

impl ProverError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ProverError::MalformedInput { message: message.into() }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        ProverError::MethodAborted { reason: reason.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("internal invariant violated: {message}");
        ProverError::Internal { message }
    }
}
