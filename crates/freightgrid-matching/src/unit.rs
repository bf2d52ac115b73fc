//! Scheduling unit that pairs open jobs with eligible providers.

use serde_json::json;
use tracing::warn;

use std::collections::HashSet;

use freightgrid_state::{
    CycleState, MatchedPair, SchedulingUnit, UnitError, UnitFuture, UnitOutcome,
};

use crate::matcher::MatchingEngine;

pub const MATCHING_UNIT_NAME: &str = "matching";

/// Below pricing, so freshly attached prices feed acceptance estimates.
pub const MATCHING_UNIT_PRIORITY: u8 = 60;

pub struct MatchingUnit {
    engine: MatchingEngine,
    priority: u8,
}

impl MatchingUnit {
    pub fn new(engine: MatchingEngine) -> Self {
        Self {
            engine,
            priority: MATCHING_UNIT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    fn run(&self, state: &mut CycleState) -> Result<UnitOutcome, UnitError> {
        let market = *state.market();
        let cycle = state.cycle();
        let now = state.cycle_started_at();

        let pairs = {
            let jobs = state.open_jobs();
            let providers = state.eligible_providers();
            self.engine.match_jobs(&jobs, &providers, &market, cycle, now)
        };

        let with_return = pairs
            .iter()
            .filter(|p| p.return_opportunity.is_some())
            .count();
        let details: Vec<_> = pairs
            .iter()
            .map(|p| {
                json!({
                    "pair_id": p.id,
                    "job_id": p.job_id,
                    "provider_id": p.provider_id,
                    "score": p.score,
                    "acceptance_probability": p.acceptance_probability,
                    "return_job_id": p.return_opportunity.as_ref().map(|r| r.job_id.clone()),
                })
            })
            .collect();
        let matched = pairs.len();

        commit_all(state, pairs)?;

        Ok(
            UnitOutcome::new(format!(
                "matched {matched} pairs ({with_return} with return legs)"
            ))
            .with_details(json!({ "pairs": details })),
        )
    }
}

/// Commit every pair or none of them.
fn commit_all(state: &mut CycleState, pairs: Vec<MatchedPair>) -> Result<(), UnitError> {
    check_batch(state, &pairs)?;
    for pair in pairs {
        state.commit_pair(pair)?;
    }
    Ok(())
}

/// Each pair must refer to an open job and a known provider, and no job or
/// provider may appear twice in the batch.
fn check_batch(state: &CycleState, pairs: &[MatchedPair]) -> Result<(), UnitError> {
    let mut jobs = HashSet::new();
    let mut providers = HashSet::new();
    for pair in pairs {
        let job_open = state.job(&pair.job_id).is_some_and(|j| j.is_open());
        let provider_known = state.provider(&pair.provider_id).is_some();
        let unique =
            jobs.insert(pair.job_id.as_str()) && providers.insert(pair.provider_id.as_str());
        if !(job_open && provider_known && unique) {
            warn!(
                pair = %pair.id,
                job = %pair.job_id,
                provider = %pair.provider_id,
                job_open,
                provider_known,
                unique,
                "pair input changed before commit"
            );
            return Err(UnitError::Consistency(format!(
                "pair {} refers to job {} or provider {} which is no longer available",
                pair.id, pair.job_id, pair.provider_id
            )));
        }
    }
    Ok(())
}

impl SchedulingUnit for MatchingUnit {
    fn name(&self) -> &str {
        MATCHING_UNIT_NAME
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn execute<'a>(&'a mut self, state: &'a mut CycleState) -> UnitFuture<'a> {
        Box::pin(async move { self.run(state) })
    }
}
