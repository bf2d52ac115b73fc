//! Scheduling unit that prices every open, unpriced job in the state.

use serde_json::json;
use tracing::info;

use freightgrid_state::{CycleState, SchedulingUnit, UnitFuture, UnitOutcome};

use crate::engine::PricingEngine;

pub const PRICING_UNIT_NAME: &str = "pricing";

/// Ranks above matching so pairs can use prices attached in the same cycle.
pub const PRICING_UNIT_PRIORITY: u8 = 80;

pub struct PricingUnit {
    engine: PricingEngine,
    priority: u8,
}

impl PricingUnit {
    pub fn new(engine: PricingEngine) -> Self {
        Self {
            engine,
            priority: PRICING_UNIT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    fn run(&self, state: &mut CycleState) -> UnitOutcome {
        let market = *state.market();
        let mut priced = Vec::new();

        for job in state.jobs_mut().filter(|j| j.needs_price()) {
            let quote = self.engine.price(job, &market);
            priced.push(json!({
                "job_id": job.id,
                "amount": quote.amount,
                "confidence": quote.confidence,
            }));
            job.apply_quote(quote);
        }

        if !priced.is_empty() {
            info!(cycle = state.cycle(), jobs = priced.len(), "jobs priced");
        }
        UnitOutcome::new(format!("priced {} jobs", priced.len()))
            .with_details(json!({ "priced": priced }))
    }
}

impl SchedulingUnit for PricingUnit {
    fn name(&self) -> &str {
        PRICING_UNIT_NAME
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn execute<'a>(&'a mut self, state: &'a mut CycleState) -> UnitFuture<'a> {
        Box::pin(async move { Ok(self.run(state)) })
    }
}
