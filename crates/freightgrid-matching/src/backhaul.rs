//! Return opportunities: a second job starting where a matched job ends.

use tracing::debug;

use freightgrid_state::{Job, Provider, ReturnOpportunity, haversine_km};

use crate::scorer::{ScoringContext, score_pair};

/// Best return leg for `provider` after delivering `matched`.
///
/// Candidates must be open, distinct from `matched`, and pick up in the
/// city `matched` delivers to. Each is scored as if the provider stood at
/// the delivery point. The best candidate at or above `return_min_score`
/// wins; ties go to the lower job id.
pub fn find_return_opportunity(
    matched: &Job,
    provider: &Provider,
    candidates: &[&Job],
    ctx: &ScoringContext<'_>,
) -> Option<ReturnOpportunity> {
    let origin = matched.delivery.point;
    let mut best: Option<(&Job, f64)> = None;

    for candidate in candidates {
        if candidate.id == matched.id
            || !candidate.is_open()
            || !candidate.pickup.same_city(&matched.delivery)
        {
            continue;
        }
        let Some((score, _)) = score_pair(candidate, provider, origin, ctx) else {
            continue;
        };
        if score < ctx.config.return_min_score {
            continue;
        }
        let better = match best {
            None => true,
            Some((current, current_score)) => {
                score > current_score || (score == current_score && candidate.id < current.id)
            }
        };
        if better {
            best = Some((candidate, score));
        }
    }

    let (job, score) = best?;
    let opportunity = ReturnOpportunity {
        job_id: job.id.clone(),
        score,
        empty_km_saved: leg_distance(matched),
        combined_earnings: provider_share(matched) + provider_share(job),
    };
    debug!(
        job = %matched.id,
        return_job = %opportunity.job_id,
        score,
        empty_km_saved = opportunity.empty_km_saved,
        "return opportunity found"
    );
    Some(opportunity)
}

/// Distance the provider would otherwise drive back empty.
fn leg_distance(job: &Job) -> f64 {
    if let Some(km) = job.distance_km {
        return km;
    }
    if let Some(quote) = &job.quote {
        return quote.breakdown.distance_km;
    }
    match (job.pickup.point, job.delivery.point) {
        (Some(a), Some(b)) => haversine_km(a, b),
        _ => 0.0,
    }
}

fn provider_share(job: &Job) -> f64 {
    job.quote
        .as_ref()
        .map(|q| q.breakdown.provider_share)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use freight_core::MatchingConfig;
    use freightgrid_state::{
        GeoPoint, JobStatus, Location, MarketSnapshot, PriceBreakdown, PriceQuote,
    };

    use crate::scorer::ClassHierarchy;

    const PARIS: GeoPoint = GeoPoint { lat: 48.8566, lng: 2.3522 };
    const LYON: GeoPoint = GeoPoint { lat: 45.7640, lng: 4.8357 };

    fn make_job(id: &str, from: (&str, GeoPoint), to: (&str, GeoPoint)) -> Job {
        let mut job = Job::new(
            id,
            Location::new(from.0, "", Some(from.1)),
            Location::new(to.0, "", Some(to.1)),
        );
        job.resource_class = Some("PL".to_string());
        job
    }

    fn with_share(mut job: Job, share: f64) -> Job {
        job.apply_quote(PriceQuote {
            amount: share,
            confidence: 0.9,
            breakdown: PriceBreakdown {
                provider_share: share,
                ..PriceBreakdown::default()
            },
        });
        job
    }

    fn make_provider() -> Provider {
        let mut p = Provider::new("p1");
        p.capabilities = vec!["PL".to_string()];
        p.available = Some(true);
        p.success_rate = Some(0.9);
        p.rating = Some(4.5);
        p.position = Some(PARIS);
        p
    }

    fn find(matched: &Job, candidates: &[&Job]) -> Option<ReturnOpportunity> {
        let config = MatchingConfig::default();
        let hierarchy = ClassHierarchy::new(&config.class_hierarchy);
        let market = MarketSnapshot::neutral(0, 1.8);
        let ctx = ScoringContext {
            config: &config,
            hierarchy: &hierarchy,
            market: &market,
        };
        find_return_opportunity(matched, &make_provider(), candidates, &ctx)
    }

    #[test]
    fn picks_job_leaving_delivery_city() {
        let mut outbound = with_share(make_job("out", ("Paris", PARIS), ("Lyon", LYON)), 400.0);
        outbound.distance_km = Some(465.0);
        let back = with_share(make_job("back", ("lyon", LYON), ("Paris", PARIS)), 380.0);
        let elsewhere = make_job("other", ("Paris", PARIS), ("Lyon", LYON));

        let opp = find(&outbound, &[&elsewhere, &back]).unwrap();
        assert_eq!(opp.job_id, "back");
        assert_eq!(opp.empty_km_saved, 465.0);
        assert!((opp.combined_earnings - 780.0).abs() < 1e-9);
        assert!(opp.score >= 0.6);
    }

    #[test]
    fn ignores_matched_candidates() {
        let outbound = make_job("out", ("Paris", PARIS), ("Lyon", LYON));
        let mut back = make_job("back", ("Lyon", LYON), ("Paris", PARIS));
        back.assign("p9", 1);
        assert_eq!(back.status, JobStatus::Matched);

        assert!(find(&outbound, &[&back]).is_none());
    }

    #[test]
    fn weak_candidates_are_not_attached() {
        let outbound = make_job("out", ("Paris", PARIS), ("Lyon", LYON));
        // Pickup far from the delivery point and an unknown class.
        let mut far = make_job("far", ("Lyon", PARIS), ("Paris", PARIS));
        far.resource_class = Some("XXL".to_string());

        let config = MatchingConfig::default();
        let hierarchy = ClassHierarchy::new(&config.class_hierarchy);
        let market = MarketSnapshot::neutral(0, 1.8);
        let ctx = ScoringContext {
            config: &config,
            hierarchy: &hierarchy,
            market: &market,
        };
        let mut provider = make_provider();
        provider.available = Some(false);
        provider.success_rate = Some(0.2);
        assert!(find_return_opportunity(&outbound, &provider, &[&far], &ctx).is_none());
    }

    #[test]
    fn empty_leg_falls_back_to_geodesic() {
        let outbound = make_job("out", ("Paris", PARIS), ("Lyon", LYON));
        let km = leg_distance(&outbound);
        assert!((km - 392.0).abs() < 5.0, "got {km}");
    }
}
