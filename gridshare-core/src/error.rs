//! Error taxonomy for the sharing engine.
//!
//! Read-permission failures and true absence share a single `NotFound`
//! message so callers cannot probe for dashboard existence.

use thiserror::Error;

/// Generic message shared by "does not exist" and "not allowed to read".
pub const GENERIC_NOT_FOUND: &str = "dashboard not found";

/// Sharing engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// The indistinguishable absence/denial error for dashboard reads.
    pub fn not_found() -> Self {
        Self::NotFound(GENERIC_NOT_FOUND.to_string())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
