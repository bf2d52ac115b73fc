//! Cross-unit insights derived from the state at the end of a cycle.
//!
//! Rules:
//! - tight market: demand > 0.7 and supply < 0.4
//! - surplus market: demand < 0.3 and supply > 0.7
//! - backhaul chain: open job A delivers to the pickup city of open job B
//! - unmatched urgent jobs
//! - weather disruption: 3 or more alerts
//! - open jobs still without a price

use serde::Serialize;
use tracing::debug;

use freightgrid_state::{CycleState, Job};

const TIGHT_DEMAND: f64 = 0.7;
const TIGHT_SUPPLY: f64 = 0.4;
const SURPLUS_DEMAND: f64 = 0.3;
const SURPLUS_SUPPLY: f64 = 0.7;
const WEATHER_ALERT_THRESHOLD: u32 = 3;
/// Chains beyond this many are counted but not reported one by one.
const MAX_CHAIN_INSIGHTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    TightMarket,
    SurplusMarket,
    BackhaulChain,
    UnmatchedUrgent,
    WeatherDisruption,
    UnpricedJobs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub severity: Severity,
    pub message: String,
    /// Jobs the insight refers to, if any.
    pub job_ids: Vec<String>,
    pub cycle: u64,
}

impl Insight {
    fn new(kind: InsightKind, severity: Severity, message: String, cycle: u64) -> Self {
        Self {
            kind,
            severity,
            message,
            job_ids: Vec::new(),
            cycle,
        }
    }

    fn with_jobs(mut self, job_ids: Vec<String>) -> Self {
        self.job_ids = job_ids;
        self
    }
}

/// Apply every rule to the final state of a cycle.
pub fn derive_insights(state: &CycleState) -> Vec<Insight> {
    let cycle = state.cycle();
    let market = state.market();
    let open = state.open_jobs();
    let mut insights = Vec::new();

    if market.demand_index > TIGHT_DEMAND && market.supply_index < TIGHT_SUPPLY {
        insights.push(Insight::new(
            InsightKind::TightMarket,
            Severity::Warning,
            format!(
                "demand {:.2} exceeds supply {:.2}",
                market.demand_index, market.supply_index
            ),
            cycle,
        ));
    } else if market.demand_index < SURPLUS_DEMAND && market.supply_index > SURPLUS_SUPPLY {
        insights.push(Insight::new(
            InsightKind::SurplusMarket,
            Severity::Info,
            format!(
                "supply {:.2} outstrips demand {:.2}",
                market.supply_index, market.demand_index
            ),
            cycle,
        ));
    }

    insights.extend(backhaul_chains(&open, cycle));

    let urgent: Vec<String> = open
        .iter()
        .filter(|j| j.urgent)
        .map(|j| j.id.clone())
        .collect();
    if !urgent.is_empty() {
        insights.push(
            Insight::new(
                InsightKind::UnmatchedUrgent,
                Severity::Warning,
                format!("{} urgent jobs remain unmatched", urgent.len()),
                cycle,
            )
            .with_jobs(urgent),
        );
    }

    if market.weather_alerts >= WEATHER_ALERT_THRESHOLD {
        insights.push(Insight::new(
            InsightKind::WeatherDisruption,
            Severity::Warning,
            format!("{} active weather alerts", market.weather_alerts),
            cycle,
        ));
    }

    let unpriced: Vec<String> = open
        .iter()
        .filter(|j| j.quote.is_none())
        .map(|j| j.id.clone())
        .collect();
    if !unpriced.is_empty() {
        insights.push(
            Insight::new(
                InsightKind::UnpricedJobs,
                Severity::Info,
                format!("{} open jobs have no price", unpriced.len()),
                cycle,
            )
            .with_jobs(unpriced),
        );
    }

    insights
}

fn backhaul_chains(open: &[&Job], cycle: u64) -> Vec<Insight> {
    let mut chains = Vec::new();
    let mut total = 0usize;
    for a in open {
        for b in open {
            if a.id == b.id || !a.delivery.same_city(&b.pickup) {
                continue;
            }
            total += 1;
            if chains.len() < MAX_CHAIN_INSIGHTS {
                chains.push(
                    Insight::new(
                        InsightKind::BackhaulChain,
                        Severity::Info,
                        format!(
                            "job {} delivers to {} where job {} picks up",
                            a.id, a.delivery.city, b.id
                        ),
                        cycle,
                    )
                    .with_jobs(vec![a.id.clone(), b.id.clone()]),
                );
            }
        }
    }
    if total > chains.len() {
        debug!(total, reported = chains.len(), "backhaul chains truncated");
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightgrid_state::{Location, MarketSnapshot, PriceQuote};

    fn make_job(id: &str, from: &str, to: &str) -> Job {
        Job::new(id, Location::new(from, "", None), Location::new(to, "", None))
    }

    fn make_state(market: MarketSnapshot) -> CycleState {
        let mut state = CycleState::new(market);
        state.begin_cycle(4, market);
        state
    }

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn quiet_state_has_no_insights() {
        let state = make_state(MarketSnapshot::neutral(0, 1.8));
        assert!(derive_insights(&state).is_empty());
    }

    #[test]
    fn tight_market_is_reported() {
        let mut market = MarketSnapshot::neutral(0, 1.8);
        market.demand_index = 0.8;
        market.supply_index = 0.3;
        let insights = derive_insights(&make_state(market));
        assert_eq!(kinds(&insights), vec![InsightKind::TightMarket]);
        assert_eq!(insights[0].severity, Severity::Warning);
        assert_eq!(insights[0].cycle, 4);
    }

    #[test]
    fn surplus_market_is_reported() {
        let mut market = MarketSnapshot::neutral(0, 1.8);
        market.demand_index = 0.2;
        market.supply_index = 0.8;
        assert_eq!(
            kinds(&derive_insights(&make_state(market))),
            vec![InsightKind::SurplusMarket]
        );
    }

    #[test]
    fn backhaul_chain_between_open_jobs() {
        let mut state = make_state(MarketSnapshot::neutral(0, 1.8));
        let mut a = make_job("a", "Paris", "Lyon");
        let mut b = make_job("b", "LYON", "Marseille");
        let mut c = make_job("c", "Lyon", "Paris");
        for job in [&mut a, &mut b, &mut c] {
            job.apply_quote(PriceQuote::default());
        }
        c.assign("p1", 1);
        state.upsert_job(a);
        state.upsert_job(b);
        state.upsert_job(c);

        let insights = derive_insights(&state);
        assert_eq!(kinds(&insights), vec![InsightKind::BackhaulChain]);
        assert_eq!(insights[0].job_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn urgent_and_unpriced_jobs_are_listed() {
        let mut market = MarketSnapshot::neutral(0, 1.8);
        market.weather_alerts = 3;
        let mut state = make_state(market);
        let mut urgent = make_job("u1", "Paris", "Lille");
        urgent.urgent = true;
        state.upsert_job(urgent);

        let insights = derive_insights(&state);
        assert_eq!(
            kinds(&insights),
            vec![
                InsightKind::UnmatchedUrgent,
                InsightKind::WeatherDisruption,
                InsightKind::UnpricedJobs
            ]
        );
        assert_eq!(insights[0].job_ids, vec!["u1".to_string()]);
    }

    #[test]
    fn chain_reports_are_capped() {
        let mut state = make_state(MarketSnapshot::neutral(0, 1.8));
        for i in 0..6 {
            let mut job = make_job(&format!("j{i}"), "Lyon", "Lyon");
            job.apply_quote(PriceQuote::default());
            state.upsert_job(job);
        }
        let insights = derive_insights(&state);
        assert_eq!(insights.len(), MAX_CHAIN_INSIGHTS);
    }
}
