//! Per-unit metrics and the orchestrator-wide snapshot.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use freightgrid_state::MarketSnapshot;

use crate::reliability::ReliabilityStrategy;

/// Number of unit failures kept for inspection.
pub const ERROR_RING_CAPACITY: usize = 64;

/// Running record for one registered unit. Written only by the
/// orchestrator.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitMetrics {
    pub priority: u8,
    pub runs: u64,
    pub failures: u64,
    pub total_duration_ms: u64,
    pub last_duration_ms: u64,
    /// In [0, 1].
    pub success_rate: f64,
    pub last_summary: Option<String>,
    pub last_error: Option<String>,
}

impl UnitMetrics {
    pub fn new(priority: u8) -> Self {
        Self {
            priority,
            runs: 0,
            failures: 0,
            total_duration_ms: 0,
            last_duration_ms: 0,
            success_rate: 1.0,
            last_summary: None,
            last_error: None,
        }
    }

    pub fn record_success(
        &mut self,
        strategy: ReliabilityStrategy,
        duration_ms: u64,
        summary: String,
    ) {
        self.record_run(duration_ms);
        self.success_rate = strategy.update(self.success_rate, self.runs, true);
        self.last_summary = Some(summary);
    }

    /// A failed run counts as a zero outcome and then scales the rate by
    /// `penalty`.
    pub fn record_failure(
        &mut self,
        strategy: ReliabilityStrategy,
        penalty: f64,
        duration_ms: u64,
        error: String,
    ) {
        self.record_run(duration_ms);
        self.failures += 1;
        let rate = strategy.update(self.success_rate, self.runs, false);
        self.success_rate = (rate * penalty).clamp(0.0, 1.0);
        self.last_error = Some(error);
    }

    pub fn avg_duration_ms(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.runs as f64
        }
    }

    fn record_run(&mut self, duration_ms: u64) {
        self.runs += 1;
        self.total_duration_ms = self.total_duration_ms.saturating_add(duration_ms);
        self.last_duration_ms = duration_ms;
    }
}

/// A recorded unit failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Unix timestamp (seconds).
    pub timestamp: u64,
    pub cycle: u64,
    pub unit: String,
    pub message: String,
}

/// Bounded ring of the most recent failures.
#[derive(Debug, Default)]
pub struct ErrorRing {
    events: VecDeque<ErrorEvent>,
}

impl ErrorRing {
    pub fn push(&mut self, event: ErrorEvent) {
        if self.events.len() == ERROR_RING_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn to_vec(&self) -> Vec<ErrorEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrchestratorMetrics {
    pub cycle_count: u64,
    pub running: bool,
    pub units: BTreeMap<String, UnitMetrics>,
    pub jobs: usize,
    pub open_jobs: usize,
    pub providers: usize,
    pub pairs: usize,
    pub market: MarketSnapshot,
    /// True when the last refresh failed and the previous snapshot was kept.
    pub market_stale: bool,
    pub last_cycle_duration_ms: u64,
    pub recent_errors: Vec<ErrorEvent>,
}
