//! freightgrid-state — domain model and shared cycle state for FreightGrid.
//!
//! Holds the jobs, providers, matched pairs, and current market snapshot
//! that every scheduling unit reads and mutates during a cycle, plus the
//! `SchedulingUnit` contract the orchestrator schedules.
//!
//! # Ownership
//!
//! ```text
//! Orchestrator
//!   └── CycleState (exclusively owned for the duration of a cycle)
//!         ├── jobs       (created externally, priced / matched by units)
//!         ├── providers  (created externally, annotated with last_matched_at)
//!         ├── pairs      (created only by the matching unit)
//!         └── market     (replaced wholesale each cycle)
//! ```
//!
//! The state is purely in-memory. Keeping it consistent with durable
//! storage is the job of an external synchronization layer.

pub mod error;
pub mod geo;
pub mod state;
pub mod types;
pub mod unit;

pub use error::{StateError, StateResult};
pub use geo::haversine_km;
pub use state::{CycleState, Seed};
pub use types::*;
pub use unit::{SchedulingUnit, UnitError, UnitFuture, UnitOutcome};
