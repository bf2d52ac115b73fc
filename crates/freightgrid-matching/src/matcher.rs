//! Matching engine: greedy exclusive assignment over ranked pairs.

use std::collections::HashSet;

use tracing::{debug, info};

use freight_core::{ConfigError, MatchingConfig};
use freightgrid_state::{Job, MarketSnapshot, MatchedPair, PairStatus, Provider};

use crate::backhaul::find_return_opportunity;
use crate::scorer::{ClassHierarchy, ScoringContext, rank_pairs};

const MIN_ACCEPTANCE: f64 = 0.10;
const MAX_ACCEPTANCE: f64 = 0.95;

pub struct MatchingEngine {
    config: MatchingConfig,
    hierarchy: ClassHierarchy,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let hierarchy = ClassHierarchy::new(&config.class_hierarchy);
        Ok(Self { config, hierarchy })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Pair jobs with providers.
    ///
    /// No job and no provider appears in more than one returned pair, and
    /// at most `max_matches_per_cycle` pairs are returned. Pairs come back
    /// in acceptance order, best score first.
    pub fn match_jobs(
        &self,
        jobs: &[&Job],
        providers: &[&Provider],
        market: &MarketSnapshot,
        cycle: u64,
        now: u64,
    ) -> Vec<MatchedPair> {
        if jobs.is_empty() || providers.is_empty() {
            debug!(
                jobs = jobs.len(),
                providers = providers.len(),
                "nothing to match"
            );
            return Vec::new();
        }

        let ctx = ScoringContext {
            config: &self.config,
            hierarchy: &self.hierarchy,
            market,
        };
        let ranked = rank_pairs(jobs, providers, &ctx);
        let candidates = ranked.len();

        let mut used_jobs = HashSet::new();
        let mut used_providers = HashSet::new();
        let mut accepted = Vec::new();

        for pair in ranked {
            if accepted.len() >= self.config.max_matches_per_cycle {
                break;
            }
            if used_jobs.contains(&pair.job_idx) || used_providers.contains(&pair.provider_idx) {
                continue;
            }
            used_jobs.insert(pair.job_idx);
            used_providers.insert(pair.provider_idx);
            accepted.push(pair);
        }

        // Return legs come from jobs left over after the greedy pass, and
        // each is suggested at most once.
        let mut suggested: HashSet<String> = HashSet::new();
        let mut pairs = Vec::with_capacity(accepted.len());

        for (n, scored) in accepted.into_iter().enumerate() {
            let job = jobs[scored.job_idx];
            let provider = providers[scored.provider_idx];

            let leftovers: Vec<&Job> = jobs
                .iter()
                .enumerate()
                .filter(|(i, j)| !used_jobs.contains(i) && !suggested.contains(&j.id))
                .map(|(_, j)| *j)
                .collect();
            let return_opportunity = find_return_opportunity(job, provider, &leftovers, &ctx);
            if let Some(opp) = &return_opportunity {
                suggested.insert(opp.job_id.clone());
            }

            let acceptance = acceptance_probability(scored.score, job, provider);
            debug!(
                job = %job.id,
                provider = %provider.id,
                score = scored.score,
                acceptance,
                "pair accepted"
            );

            pairs.push(MatchedPair {
                id: format!("match-{cycle}-{}", n + 1),
                job_id: job.id.clone(),
                provider_id: provider.id.clone(),
                score: scored.score,
                breakdown: scored.breakdown,
                acceptance_probability: acceptance,
                return_opportunity,
                status: PairStatus::Proposed,
                cycle,
                created_at: now,
            });
        }

        info!(
            cycle,
            jobs = jobs.len(),
            providers = providers.len(),
            candidates,
            matched = pairs.len(),
            "matching pass complete"
        );
        pairs
    }
}

/// Likelihood that the provider accepts the job, starting from the pair
/// score.
///
/// Earnings per kilometer (provider share over priced distance) move it
/// between -0.15 and +0.10; average response time between -0.10 and
/// +0.05. Unpriced jobs and unknown response times leave it unchanged.
pub fn acceptance_probability(score: f64, job: &Job, provider: &Provider) -> f64 {
    let mut p = score;

    if let Some(quote) = &job.quote
        && quote.breakdown.distance_km > 0.0
    {
        let per_km = quote.breakdown.provider_share / quote.breakdown.distance_km;
        p += if per_km >= 1.8 {
            0.10
        } else if per_km >= 1.4 {
            0.05
        } else if per_km < 1.0 {
            -0.15
        } else if per_km < 1.2 {
            -0.05
        } else {
            0.0
        };
    }

    if let Some(minutes) = provider.avg_response_minutes {
        p += if minutes <= 15.0 {
            0.05
        } else if minutes > 120.0 {
            -0.10
        } else if minutes > 60.0 {
            -0.05
        } else {
            0.0
        };
    }

    p.clamp(MIN_ACCEPTANCE, MAX_ACCEPTANCE)
}
