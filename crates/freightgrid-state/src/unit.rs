//! The scheduling unit contract.
//!
//! Every piece of decision logic the orchestrator runs implements
//! `SchedulingUnit`. A unit receives the cycle state by mutable reference
//! for the duration of `execute` and must not retain it afterwards.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::error::StateError;
use crate::state::CycleState;

/// Boxed future returned by `SchedulingUnit::execute`.
pub type UnitFuture<'a> =
    Pin<Box<dyn Future<Output = Result<UnitOutcome, UnitError>> + Send + 'a>>;

/// Result of a successful unit run.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    /// Short human-readable summary used in metrics and logs.
    pub summary: String,
    /// Structured detail for observers.
    pub details: serde_json::Value,
}

impl UnitOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Errors a unit may report. The orchestrator records them; they never
/// abort a cycle.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit failed: {0}")]
    Failed(String),

    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// A named, prioritized piece of decision logic run once per cycle.
pub trait SchedulingUnit: Send {
    /// Unique name used as the registry key.
    fn name(&self) -> &str;

    /// Initial priority in 0..=100. Higher runs earlier.
    fn priority(&self) -> u8;

    fn execute<'a>(&'a mut self, state: &'a mut CycleState) -> UnitFuture<'a>;
}
