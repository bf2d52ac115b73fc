//! Unit reliability: success-rate folding and priority self-tuning.
//!
//! ```text
//! running mean: rate = (rate * (runs - 1) + outcome) / runs
//! ewma:         rate = alpha * outcome + (1 - alpha) * rate
//! failure:      rate = update(rate, 0) * failure_penalty
//! ```
//!
//! After every cycle a unit that has run at least once gains one priority
//! point while its rate is above `promote_above` and loses one while it is
//! below `demote_below`. Priorities stay within 0..=100.

use freight_core::{ReliabilityKind, SchedulerConfig};

pub const MAX_PRIORITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReliabilityStrategy {
    RunningMean,
    Ewma { alpha: f64 },
}

impl ReliabilityStrategy {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        match config.reliability {
            ReliabilityKind::RunningMean => Self::RunningMean,
            ReliabilityKind::Ewma => Self::Ewma {
                alpha: config.reliability_alpha,
            },
        }
    }

    /// Fold one outcome into `rate`. `runs` already counts this run.
    pub fn update(&self, rate: f64, runs: u64, success: bool) -> f64 {
        let outcome = if success { 1.0 } else { 0.0 };
        if runs <= 1 {
            return outcome;
        }
        match *self {
            Self::RunningMean => (rate * (runs - 1) as f64 + outcome) / runs as f64,
            Self::Ewma { alpha } => alpha * outcome + (1.0 - alpha) * rate,
        }
    }
}

/// Next priority for a unit. Units that never ran keep their priority.
pub fn tune_priority(
    priority: u8,
    success_rate: f64,
    runs: u64,
    promote_above: f64,
    demote_below: f64,
) -> u8 {
    if runs == 0 {
        return priority;
    }
    if success_rate > promote_above {
        priority.saturating_add(1).min(MAX_PRIORITY)
    } else if success_rate < demote_below {
        priority.saturating_sub(1)
    } else {
        priority
    }
}
