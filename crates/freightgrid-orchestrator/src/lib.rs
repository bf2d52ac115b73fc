//! freightgrid-orchestrator — the cycle scheduler.
//!
//! Owns the single `CycleState` and runs every registered
//! `SchedulingUnit` against it once per cycle, strictly one after another.
//! Unit failures and timeouts are recorded in per-unit metrics and an error
//! ring; they never stop the loop. After each cycle the orchestrator
//! derives insights, retunes unit priorities from their success rates, and
//! notifies observers.
//!
//! # Components
//!
//! - **`orchestrator`** — registry, cycle loop, start/stop
//! - **`reliability`** — success-rate strategies and priority tuning
//! - **`metrics`** — per-unit metrics, error ring, orchestrator snapshot
//! - **`insights`** — rule-based observations over the final state
//! - **`observer`** — end-of-cycle callbacks
//! - **`prometheus`** — text exposition of the metrics snapshot

pub mod error;
pub mod insights;
pub mod metrics;
pub mod observer;
pub mod orchestrator;
pub mod prometheus;
pub mod reliability;

pub use error::{OrchestratorError, OrchestratorResult};
pub use insights::{Insight, InsightKind, Severity, derive_insights};
pub use metrics::{ERROR_RING_CAPACITY, ErrorEvent, OrchestratorMetrics, UnitMetrics};
pub use observer::{CycleObserver, TracingObserver};
pub use orchestrator::{CycleReport, Orchestrator, UnitRun};
pub use prometheus::render_prometheus;
pub use reliability::{MAX_PRIORITY, ReliabilityStrategy, tune_priority};
