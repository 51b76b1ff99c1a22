//! Common result and error types for the Kiln engine.

/// The standard result type for operations that can only fail through a bug.
///
/// User-facing failures (missing scanners, bad configuration) have their own
/// error enums in the crates that detect them. `Err` here means the engine's
/// own bookkeeping is inconsistent.
pub type KilnResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Kiln, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
