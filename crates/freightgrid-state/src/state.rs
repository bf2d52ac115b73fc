//! CycleState — the single mutable state shared by scheduling units.
//!
//! Jobs and providers are keyed by id in ordered maps so every pass over
//! them is deterministic. Matched pairs accumulate until an external
//! synchronization layer drains them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::*;

/// JSON document used to seed jobs and providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub providers: Vec<Provider>,
}

#[derive(Debug, Clone)]
pub struct CycleState {
    jobs: BTreeMap<JobId, Job>,
    providers: BTreeMap<ProviderId, Provider>,
    pairs: Vec<MatchedPair>,
    market: MarketSnapshot,
    cycle: u64,
    /// Unix timestamp (seconds) at which the current cycle started.
    cycle_started_at: u64,
}

impl CycleState {
    pub fn new(market: MarketSnapshot) -> Self {
        Self {
            jobs: BTreeMap::new(),
            providers: BTreeMap::new(),
            pairs: Vec::new(),
            market,
            cycle: 0,
            cycle_started_at: market.timestamp,
        }
    }

    /// Build a state from a seed document.
    pub fn from_seed_json(json: &str, market: MarketSnapshot) -> StateResult<Self> {
        let seed: Seed = serde_json::from_str(json)?;
        let mut state = Self::new(market);
        for job in seed.jobs {
            state.upsert_job(job);
        }
        for provider in seed.providers {
            state.upsert_provider(provider);
        }
        debug!(
            jobs = state.jobs.len(),
            providers = state.providers.len(),
            "state seeded"
        );
        Ok(state)
    }

    // ── Cycle bookkeeping ─────────────────────────────────────────

    /// Mark the start of a new cycle with a fresh market snapshot.
    pub fn begin_cycle(&mut self, cycle: u64, market: MarketSnapshot) {
        self.cycle = cycle;
        self.cycle_started_at = market.timestamp;
        self.market = market;
    }

    /// Start a new cycle at `started_at` while keeping the previous
    /// market snapshot.
    pub fn begin_cycle_with_stale_market(&mut self, cycle: u64, started_at: u64) {
        self.cycle = cycle;
        self.cycle_started_at = started_at;
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn cycle_started_at(&self) -> u64 {
        self.cycle_started_at
    }

    pub fn market(&self) -> &MarketSnapshot {
        &self.market
    }

    // ── Jobs ──────────────────────────────────────────────────────

    /// Insert or replace a job. Returns the previous record.
    pub fn upsert_job(&mut self, job: Job) -> Option<Job> {
        self.jobs.insert(job.id.clone(), job)
    }

    pub fn remove_job(&mut self, id: &str) -> Option<Job> {
        self.jobs.remove(id)
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn job_mut(&mut self, id: &str) -> StateResult<&mut Job> {
        self.jobs
            .get_mut(id)
            .ok_or_else(|| StateError::NotFound(format!("job {id}")))
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    /// Jobs still waiting for a provider.
    pub fn open_jobs(&self) -> Vec<&Job> {
        self.jobs.values().filter(|j| j.is_open()).collect()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    // ── Providers ─────────────────────────────────────────────────

    pub fn upsert_provider(&mut self, provider: Provider) -> Option<Provider> {
        self.providers.insert(provider.id.clone(), provider)
    }

    pub fn remove_provider(&mut self, id: &str) -> Option<Provider> {
        self.providers.remove(id)
    }

    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.get(id)
    }

    pub fn provider_mut(&mut self, id: &str) -> StateResult<&mut Provider> {
        self.providers
            .get_mut(id)
            .ok_or_else(|| StateError::NotFound(format!("provider {id}")))
    }

    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    /// Active or qualified providers.
    pub fn eligible_providers(&self) -> Vec<&Provider> {
        self.providers.values().filter(|p| p.is_eligible()).collect()
    }

    /// Attach (or clear) the external risk score for a provider.
    pub fn set_risk_score(&mut self, id: &str, score: Option<f64>) -> StateResult<()> {
        let provider = self.provider_mut(id)?;
        provider.risk_score = score.map(|s| s.clamp(0.0, 1.0));
        Ok(())
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    // ── Pairs ─────────────────────────────────────────────────────

    /// Commit a pair: record it, mark the job matched, and stamp the provider.
    ///
    /// Fails with a consistency violation if either side is missing or the
    /// job already holds a match.
    pub fn commit_pair(&mut self, pair: MatchedPair) -> StateResult<()> {
        let job = self.jobs.get(&pair.job_id).ok_or_else(|| {
            StateError::Consistency(format!("job {} vanished before commit", pair.job_id))
        })?;
        if !job.is_open() {
            return Err(StateError::Consistency(format!(
                "job {} already holds a match",
                pair.job_id
            )));
        }
        if !self.providers.contains_key(&pair.provider_id) {
            return Err(StateError::Consistency(format!(
                "provider {} vanished before commit",
                pair.provider_id
            )));
        }

        let at = pair.created_at;
        self.job_mut(&pair.job_id)?.assign(&pair.provider_id, at);
        self.provider_mut(&pair.provider_id)?.last_matched_at = Some(at);
        self.pairs.push(pair);
        Ok(())
    }

    pub fn pairs(&self) -> &[MatchedPair] {
        &self.pairs
    }

    /// Pairs created during the given cycle.
    pub fn pairs_in_cycle(&self, cycle: u64) -> impl Iterator<Item = &MatchedPair> {
        self.pairs.iter().filter(move |p| p.cycle == cycle)
    }

    /// Hand all recorded pairs to an external collaborator.
    pub fn drain_pairs(&mut self) -> Vec<MatchedPair> {
        std::mem::take(&mut self.pairs)
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}
