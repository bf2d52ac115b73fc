//! Pair scoring for matching decisions.
//!
//! Evaluates a (job, provider) pair using a weighted combination of:
//! - **Proximity**: linear falloff from the provider to the pickup point
//! - **Capability**: exact class, higher-capacity substitute, or mismatch
//! - **History**: the provider's historical success rate
//! - **Availability**: reported availability, adjusted by market supply when unknown
//! - **Reputation**: rating out of five
//! - **Route**: whether the job lies on one of the provider's preferred routes
//!
//! The weighted sum is then scaled down by the provider's risk score, if any.

use std::collections::HashMap;

use freight_core::MatchingConfig;
use freightgrid_state::{
    GeoPoint, Job, MarketSnapshot, MatchBreakdown, Provider, haversine_km,
};

/// Neutral value for factors whose inputs are missing.
const NEUTRAL: f64 = 0.5;
const DEFAULT_HISTORY: f64 = 0.75;
const UNKNOWN_AVAILABILITY: f64 = 0.6;
const SUBSTITUTE_FIT: f64 = 0.7;
const MISMATCH_FIT: f64 = 0.3;
const OFF_ROUTE: f64 = 0.3;

/// Resource classes ordered by capacity; a higher class can stand in for a
/// lower one.
#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    ranks: HashMap<String, usize>,
}

impl ClassHierarchy {
    pub fn new(classes: &[String]) -> Self {
        Self {
            ranks: classes
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), i))
                .collect(),
        }
    }

    pub fn rank(&self, class: &str) -> Option<usize> {
        self.ranks.get(class).copied()
    }

    /// 1.0 for an exact match, 0.7 when the provider offers any
    /// higher-capacity class, 0.3 otherwise.
    pub fn fit(&self, required: &str, offered: &[String]) -> f64 {
        if offered.iter().any(|c| c == required) {
            return 1.0;
        }
        let Some(required_rank) = self.rank(required) else {
            return MISMATCH_FIT;
        };
        let substitutes = offered
            .iter()
            .filter_map(|c| self.rank(c))
            .any(|r| r > required_rank);
        if substitutes { SUBSTITUTE_FIT } else { MISMATCH_FIT }
    }
}

/// Everything a score depends on besides the pair itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub config: &'a MatchingConfig,
    pub hierarchy: &'a ClassHierarchy,
    pub market: &'a MarketSnapshot,
}

/// Scored candidate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    /// Index into the job slice passed to `rank_pairs`.
    pub job_idx: usize,
    /// Index into the provider slice passed to `rank_pairs`.
    pub provider_idx: usize,
    /// Composite score in [0, 1].
    pub score: f64,
    pub breakdown: MatchBreakdown,
}

/// Score a single pair. `origin` is where the provider starts from;
/// `None` yields a neutral proximity.
///
/// Returns `None` for providers that are not active or qualified.
pub fn score_pair(
    job: &Job,
    provider: &Provider,
    origin: Option<GeoPoint>,
    ctx: &ScoringContext<'_>,
) -> Option<(f64, MatchBreakdown)> {
    if !provider.is_eligible() {
        return None;
    }

    let w = &ctx.config.weights;
    let breakdown = MatchBreakdown {
        proximity: proximity(origin, job.pickup.point, ctx.config.proximity_radius_km),
        capability: capability(job, provider, ctx.hierarchy),
        history: provider
            .success_rate
            .map(|r| r.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_HISTORY),
        availability: availability(provider.available, ctx.market.supply_index),
        reputation: provider
            .rating
            .map(|r| (r / 5.0).clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL),
        route: route_preference(job, provider),
        risk_multiplier: 1.0
            - ctx.config.risk_penalty * provider.risk_score.unwrap_or(0.0).clamp(0.0, 1.0),
    };

    let weighted = w.proximity * breakdown.proximity
        + w.capability * breakdown.capability
        + w.history * breakdown.history
        + w.availability * breakdown.availability
        + w.reputation * breakdown.reputation
        + w.route * breakdown.route;

    Some(((weighted * breakdown.risk_multiplier).clamp(0.0, 1.0), breakdown))
}

/// Score every eligible pair, drop those under `min_match_score`, and
/// return the rest best first.
///
/// Ties are ordered by job id, then provider id, so runs are reproducible.
pub fn rank_pairs(jobs: &[&Job], providers: &[&Provider], ctx: &ScoringContext<'_>) -> Vec<PairScore> {
    if jobs.is_empty() || providers.is_empty() {
        return Vec::new();
    }

    let mut scores = Vec::new();
    for (job_idx, job) in jobs.iter().enumerate() {
        for (provider_idx, provider) in providers.iter().enumerate() {
            let Some((score, breakdown)) = score_pair(job, provider, provider.position, ctx)
            else {
                continue;
            };
            if score.is_nan() || score < ctx.config.min_match_score {
                continue;
            }
            scores.push(PairScore {
                job_idx,
                provider_idx,
                score,
                breakdown,
            });
        }
    }

    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| jobs[a.job_idx].id.cmp(&jobs[b.job_idx].id))
            .then_with(|| providers[a.provider_idx].id.cmp(&providers[b.provider_idx].id))
    });
    scores
}

fn proximity(origin: Option<GeoPoint>, pickup: Option<GeoPoint>, radius_km: f64) -> f64 {
    match (origin, pickup) {
        (Some(a), Some(b)) => (1.0 - haversine_km(a, b) / radius_km).max(0.0),
        _ => NEUTRAL,
    }
}

/// Uses the job's declared class, else the class it was priced as.
fn capability(job: &Job, provider: &Provider, hierarchy: &ClassHierarchy) -> f64 {
    let required = job
        .resource_class
        .as_deref()
        .or_else(|| job.quote.as_ref().map(|q| q.breakdown.resource_class.as_str()));
    match required {
        Some(class) => hierarchy.fit(class, &provider.capabilities),
        None => NEUTRAL,
    }
}

fn availability(available: Option<bool>, supply_index: f64) -> f64 {
    match available {
        Some(true) => 1.0,
        Some(false) => 0.0,
        None => (UNKNOWN_AVAILABILITY + (supply_index - 0.5) * 0.2).clamp(0.0, 1.0),
    }
}

fn route_preference(job: &Job, provider: &Provider) -> f64 {
    if provider.preferred_routes.is_empty() {
        return NEUTRAL;
    }
    let pickup = job.pickup.city.to_lowercase();
    let delivery = job.delivery.city.to_lowercase();
    let on_route = provider.preferred_routes.iter().any(|r| {
        let from = r.from.trim().to_lowercase();
        let to = r.to.trim().to_lowercase();
        !from.is_empty() && !to.is_empty() && pickup.contains(&from) && delivery.contains(&to)
    });
    if on_route { 1.0 } else { OFF_ROUTE }
}
