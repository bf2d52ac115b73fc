//! Orchestrator errors. All of them surface at startup or registration;
//! nothing raised inside a cycle uses this type.

use freight_core::ConfigError;
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("unit `{0}` is already registered")]
    DuplicateUnit(String),

    #[error("unit `{name}` has priority {priority}, expected 0..=100")]
    InvalidPriority { name: String, priority: u8 },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
