//! Error types for the cycle state.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A record a unit relied on vanished or changed mid-pass.
    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("invalid seed document: {0}")]
    Seed(#[from] serde_json::Error),
}
