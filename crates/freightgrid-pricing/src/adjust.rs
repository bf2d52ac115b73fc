//! Market adjustment factors.
//!
//! Each factor is multiplicative and equals 1.0 in a neutral market.

use freightgrid_state::{Job, MarketSnapshot};

const FUEL_DAMPING: f64 = 0.3;
const DEMAND_DAMPING: f64 = 0.2;
const TRAFFIC_SCALE: f64 = 0.1;
const WEATHER_SCALE: f64 = 0.05;
const URGENCY_FACTOR: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    pub fuel: f64,
    pub demand: f64,
    pub traffic: f64,
    pub weather: f64,
    pub urgency: f64,
}

impl Adjustments {
    pub fn compute(job: &Job, market: &MarketSnapshot, reference_fuel_price: f64) -> Self {
        let fuel_deviation = (market.fuel_price - reference_fuel_price) / reference_fuel_price;
        Self {
            fuel: 1.0 + fuel_deviation * FUEL_DAMPING,
            demand: 1.0 + (market.demand_index - 0.5) * DEMAND_DAMPING,
            traffic: 1.0 + market.traffic_index * TRAFFIC_SCALE,
            weather: 1.0 + f64::from(market.weather_alerts) * WEATHER_SCALE,
            urgency: if job.urgent { URGENCY_FACTOR } else { 1.0 },
        }
    }

    pub fn total(&self) -> f64 {
        self.fuel * self.demand * self.traffic * self.weather * self.urgency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightgrid_state::Location;

    fn job() -> Job {
        Job::new("j1", Location::default(), Location::default())
    }

    #[test]
    fn neutral_market_has_unit_adjustment() {
        let market = MarketSnapshot::neutral(0, 1.80);
        let adj = Adjustments::compute(&job(), &market, 1.80);
        assert!((adj.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn each_factor_moves_independently() {
        let market = MarketSnapshot {
            timestamp: 0,
            demand_index: 1.0,
            supply_index: 0.5,
            fuel_price: 2.16,
            traffic_index: 0.5,
            weather_alerts: 2,
        };
        let mut urgent = job();
        urgent.urgent = true;
        let adj = Adjustments::compute(&urgent, &market, 1.80);

        assert!((adj.fuel - 1.06).abs() < 1e-9);
        assert!((adj.demand - 1.10).abs() < 1e-9);
        assert!((adj.traffic - 1.05).abs() < 1e-9);
        assert!((adj.weather - 1.10).abs() < 1e-9);
        assert_eq!(adj.urgency, 1.25);
        let expected = 1.06 * 1.10 * 1.05 * 1.10 * 1.25;
        assert!((adj.total() - expected).abs() < 1e-9);
    }

    #[test]
    fn cheap_fuel_lowers_cost() {
        let mut market = MarketSnapshot::neutral(0, 1.44);
        market.demand_index = 0.0;
        let adj = Adjustments::compute(&job(), &market, 1.80);
        assert!(adj.fuel < 1.0);
        assert!(adj.demand < 1.0);
    }
}
