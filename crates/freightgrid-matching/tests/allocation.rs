//! Integration tests for the allocation pass.
//!
//! These tests drive the matching engine over generated populations:
//! - Exclusivity across any mix of jobs and providers
//! - Return legs attached only to jobs left over by the greedy pass
//! - Score never rising as a provider moves away from the pickup
//! - Pricing followed by matching on one shared cycle state

use std::collections::HashSet;

use proptest::prelude::*;

use freight_core::{MatchingConfig, PricingConfig};
use freightgrid_matching::{
    ClassHierarchy, MatchingEngine, MatchingUnit, ScoringContext, score_pair,
};
use freightgrid_pricing::{PricingEngine, PricingUnit};
use freightgrid_state::{
    CycleState, GeoPoint, Job, JobStatus, Location, MarketSnapshot, Provider, SchedulingUnit,
};

const CITIES: [(&str, GeoPoint); 4] = [
    ("Paris", GeoPoint { lat: 48.8566, lng: 2.3522 }),
    ("Lyon", GeoPoint { lat: 45.7640, lng: 4.8357 }),
    ("Lille", GeoPoint { lat: 50.6292, lng: 3.0573 }),
    ("Nantes", GeoPoint { lat: 47.2184, lng: -1.5536 }),
];
const CLASSES: [&str; 3] = ["VL", "PL", "SPL"];

#[derive(Debug, Clone)]
struct JobSpec {
    from: usize,
    to: usize,
    class: usize,
    distance_km: f64,
    urgent: bool,
}

#[derive(Debug, Clone)]
struct ProviderSpec {
    base: usize,
    dlat: f64,
    dlng: f64,
    class: usize,
    success_rate: f64,
    rating: f64,
    available: Option<bool>,
    risk_score: Option<f64>,
}

prop_compose! {
    fn job_spec()(
        from in 0..CITIES.len(),
        to in 0..CITIES.len(),
        class in 0..CLASSES.len(),
        distance_km in 50.0f64..650.0,
        urgent in prop::bool::weighted(0.2),
    ) -> JobSpec {
        JobSpec { from, to, class, distance_km, urgent }
    }
}

prop_compose! {
    fn provider_spec()(
        base in 0..CITIES.len(),
        dlat in -0.15f64..0.15,
        dlng in -0.15f64..0.15,
        class in 0..CLASSES.len(),
        success_rate in 0.6f64..1.0,
        rating in 3.0f64..5.0,
        available in prop::option::of(any::<bool>()),
        risk_score in prop::option::of(0.0f64..1.0),
    ) -> ProviderSpec {
        ProviderSpec { base, dlat, dlng, class, success_rate, rating, available, risk_score }
    }
}

fn population(
    max_jobs: usize,
    max_providers: usize,
) -> impl Strategy<Value = (Vec<JobSpec>, Vec<ProviderSpec>)> {
    (
        prop::collection::vec(job_spec(), 0..max_jobs),
        prop::collection::vec(provider_spec(), 0..max_providers),
    )
}

fn make_job(spec: &JobSpec, id: usize) -> Job {
    let (from, from_pt) = CITIES[spec.from];
    let (to, to_pt) = CITIES[spec.to];
    let mut job = Job::new(
        &format!("job-{id:03}"),
        Location::new(from, "", Some(from_pt)),
        Location::new(to, "", Some(to_pt)),
    );
    job.resource_class = Some(CLASSES[spec.class].to_string());
    job.distance_km = Some(spec.distance_km);
    job.urgent = spec.urgent;
    job
}

fn make_provider(spec: &ProviderSpec, id: usize) -> Provider {
    let (_, base) = CITIES[spec.base];
    let mut p = Provider::new(&format!("prov-{id:03}"));
    p.position = Some(GeoPoint {
        lat: base.lat + spec.dlat,
        lng: base.lng + spec.dlng,
    });
    p.capabilities = vec![CLASSES[spec.class].to_string()];
    p.success_rate = Some(spec.success_rate);
    p.rating = Some(spec.rating);
    p.available = spec.available;
    p.risk_score = spec.risk_score;
    p
}

fn make_state(jobs: &[JobSpec], providers: &[ProviderSpec]) -> CycleState {
    let mut state = CycleState::new(MarketSnapshot::neutral(0, 1.8));
    state.begin_cycle(1, MarketSnapshot::neutral(1_700_000_000, 1.8));
    for (i, spec) in jobs.iter().enumerate() {
        state.upsert_job(make_job(spec, i));
    }
    for (i, spec) in providers.iter().enumerate() {
        state.upsert_provider(make_provider(spec, i));
    }
    state
}

/// A fixed mixed population: every city pair in every class.
fn fixed_state() -> CycleState {
    let mut jobs = Vec::new();
    for from in 0..CITIES.len() {
        for to in 0..CITIES.len() {
            jobs.push(JobSpec {
                from,
                to,
                class: (from + to) % CLASSES.len(),
                distance_km: 120.0 + 45.0 * (from * 4 + to) as f64,
                urgent: from == to,
            });
        }
    }
    let providers: Vec<_> = (0..12)
        .map(|i| ProviderSpec {
            base: i % CITIES.len(),
            dlat: 0.01 * i as f64,
            dlng: -0.01 * i as f64,
            class: i % CLASSES.len(),
            success_rate: 0.7 + 0.02 * i as f64,
            rating: 3.5 + 0.1 * i as f64,
            available: if i % 3 == 0 { None } else { Some(true) },
            risk_score: None,
        })
        .collect();
    make_state(&jobs, &providers)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_job_or_provider_is_paired_twice((jobs, providers) in population(40, 25)) {
        let engine = MatchingEngine::new(MatchingConfig {
            min_match_score: 0.5,
            max_matches_per_cycle: 1_000,
            ..MatchingConfig::default()
        })
        .unwrap();
        let state = make_state(&jobs, &providers);
        let jobs = state.open_jobs();
        let providers = state.eligible_providers();
        let pairs = engine.match_jobs(&jobs, &providers, state.market(), 1, 0);

        let mut seen_jobs = HashSet::new();
        let mut seen_providers = HashSet::new();
        for pair in &pairs {
            prop_assert!(seen_jobs.insert(pair.job_id.clone()), "job reused");
            prop_assert!(seen_providers.insert(pair.provider_id.clone()), "provider reused");
            prop_assert!(pair.score >= 0.5);
            prop_assert!((0.10..=0.95).contains(&pair.acceptance_probability));
        }
        prop_assert!(pairs.len() <= providers.len().min(jobs.len()));
        for window in pairs.windows(2) {
            prop_assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn return_legs_never_point_at_matched_jobs((jobs, providers) in population(30, 10)) {
        let engine = MatchingEngine::new(MatchingConfig {
            min_match_score: 0.5,
            ..MatchingConfig::default()
        })
        .unwrap();
        let state = make_state(&jobs, &providers);
        let jobs = state.open_jobs();
        let providers = state.eligible_providers();
        let pairs = engine.match_jobs(&jobs, &providers, state.market(), 1, 0);

        let matched: HashSet<_> = pairs.iter().map(|p| p.job_id.as_str()).collect();
        let mut suggested = HashSet::new();
        for pair in &pairs {
            let Some(opp) = &pair.return_opportunity else { continue };
            prop_assert!(!matched.contains(opp.job_id.as_str()));
            prop_assert!(suggested.insert(opp.job_id.clone()), "return leg suggested twice");
            prop_assert!(opp.score >= 0.6);

            let outbound = state.job(&pair.job_id).unwrap();
            let back = state.job(&opp.job_id).unwrap();
            prop_assert!(back.pickup.same_city(&outbound.delivery));
        }
    }

    #[test]
    fn moving_away_never_raises_the_score(
        spec in provider_spec(),
        job in job_spec(),
        near_deg in 0.0f64..3.0,
        extra_deg in 0.0f64..3.0,
    ) {
        let config = MatchingConfig::default();
        let hierarchy = ClassHierarchy::new(&config.class_hierarchy);
        let market = MarketSnapshot::neutral(0, 1.8);
        let ctx = ScoringContext { config: &config, hierarchy: &hierarchy, market: &market };

        let job = make_job(&job, 0);
        let provider = make_provider(&spec, 0);
        let pickup = job.pickup.point.unwrap();
        let near = GeoPoint { lat: pickup.lat, lng: pickup.lng + near_deg };
        let far = GeoPoint { lat: pickup.lat, lng: pickup.lng + near_deg + extra_deg };

        let (near_score, _) = score_pair(&job, &provider, Some(near), &ctx).unwrap();
        let (far_score, _) = score_pair(&job, &provider, Some(far), &ctx).unwrap();
        prop_assert!(near_score >= far_score, "{near_score} < {far_score}");
    }
}

#[tokio::test]
async fn pricing_then_matching_on_shared_state() {
    let mut state = fixed_state();
    let total = state.job_count();

    let mut pricing = PricingUnit::new(PricingEngine::new(PricingConfig::default()).unwrap());
    let mut matching = MatchingUnit::new(
        MatchingEngine::new(MatchingConfig {
            min_match_score: 0.5,
            ..MatchingConfig::default()
        })
        .unwrap(),
    );

    pricing.execute(&mut state).await.unwrap();
    matching.execute(&mut state).await.unwrap();

    assert!(state.jobs().all(|j| j.quote.is_some()));
    assert!(state.pair_count() > 0);
    for pair in state.pairs() {
        let job = state.job(&pair.job_id).unwrap();
        assert_eq!(job.status, JobStatus::Matched);
        assert_eq!(job.assigned_provider.as_deref(), Some(pair.provider_id.as_str()));
        assert_eq!(job.matched_at, Some(1_700_000_000));
    }
    let unmatched = state.jobs().filter(|j| j.is_open()).count();
    assert_eq!(unmatched + state.pair_count(), total);
}
