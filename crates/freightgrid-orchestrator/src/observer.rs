//! Cycle observers.
//!
//! Observers are called synchronously at the end of each cycle with shared
//! references, so they can report on a cycle but never change it. Keep
//! callbacks short; hand heavy work to a channel or task.

use tracing::{info, warn};

use crate::insights::{Insight, Severity};
use crate::metrics::OrchestratorMetrics;

pub trait CycleObserver: Send + Sync {
    fn on_insight(&self, _insight: &Insight) {}

    fn on_cycle_complete(&self, _metrics: &OrchestratorMetrics) {}
}

/// Logs insights and cycle summaries through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CycleObserver for TracingObserver {
    fn on_insight(&self, insight: &Insight) {
        match insight.severity {
            Severity::Warning => warn!(
                kind = ?insight.kind,
                cycle = insight.cycle,
                jobs = insight.job_ids.len(),
                "{}",
                insight.message
            ),
            Severity::Info => info!(
                kind = ?insight.kind,
                cycle = insight.cycle,
                jobs = insight.job_ids.len(),
                "{}",
                insight.message
            ),
        }
    }

    fn on_cycle_complete(&self, metrics: &OrchestratorMetrics) {
        info!(
            cycle = metrics.cycle_count,
            duration_ms = metrics.last_cycle_duration_ms,
            jobs = metrics.jobs,
            open_jobs = metrics.open_jobs,
            providers = metrics.providers,
            pairs = metrics.pairs,
            market_stale = metrics.market_stale,
            "cycle complete"
        );
    }
}
