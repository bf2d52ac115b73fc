//! Pricing engine — prices a job against a market snapshot.

use tracing::debug;

use freight_core::{ClassCost, ConfigError, PricingConfig};
use freightgrid_state::{Job, MarketSnapshot, PriceBreakdown, PriceQuote};

use crate::adjust::Adjustments;
use crate::cost::{BaseCost, ResolvedClass, resolve_class, resolve_distance};

const MARGIN_STEP: f64 = 0.02;
const SNAP_ULPS: f64 = 4.0;
const HIGH_DEMAND: f64 = 0.7;
const LOW_DEMAND: f64 = 0.3;

const BASE_CONFIDENCE: f64 = 0.9;
/// Total adjustments outside this band lower confidence.
const EXPECTED_ADJUSTMENT: (f64, f64) = (0.9, 1.2);

#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
    default_cost: ClassCost,
}

impl PricingEngine {
    /// Validates the config up front; pricing itself cannot fail.
    pub fn new(config: PricingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let default_cost = config
            .cost_table
            .get(&config.default_class)
            .copied()
            .ok_or_else(|| ConfigError::Invalid {
                field: "pricing.default_class".to_string(),
                reason: "no cost table entry".to_string(),
            })?;
        Ok(Self {
            config,
            default_cost,
        })
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price a job. Pure given its inputs.
    pub fn price(&self, job: &Job, market: &MarketSnapshot) -> PriceQuote {
        let (distance_km, distance_estimated) = resolve_distance(job, &self.config);
        let class = self.class_for(job);
        let base = BaseCost::compute(distance_km, &class.cost);
        let base_cost = base.total();

        let adj = Adjustments::compute(job, market, self.config.reference_fuel_price);
        let total_adjustment = adj.total();
        let adjusted_cost = base_cost * total_adjustment;

        let margin = self.dynamic_margin(market.demand_index);
        let unrounded_price = adjusted_cost / (1.0 - margin);
        let amount = self.round_up(unrounded_price);
        let platform_share = amount * margin;

        let confidence = confidence(total_adjustment, distance_estimated, class.defaulted);

        debug!(
            job = %job.id,
            class = %class.name,
            distance_km,
            base_cost,
            total_adjustment,
            margin,
            amount,
            confidence,
            "job priced"
        );

        PriceQuote {
            amount,
            confidence,
            breakdown: PriceBreakdown {
                distance_km,
                distance_estimated,
                resource_class: class.name,
                class_defaulted: class.defaulted,
                duration_hours: base.duration_hours,
                distance_cost: base.distance_cost,
                time_cost: base.time_cost,
                extra_days: base.extra_days,
                day_surcharge: base.day_surcharge,
                base_cost,
                fuel_factor: adj.fuel,
                demand_factor: adj.demand,
                traffic_factor: adj.traffic,
                weather_factor: adj.weather,
                urgency_factor: adj.urgency,
                total_adjustment,
                adjusted_cost,
                margin,
                unrounded_price,
                platform_share,
                provider_share: amount - platform_share,
            },
        }
    }

    /// Base margin nudged by demand, clamped to the configured bounds.
    pub fn dynamic_margin(&self, demand_index: f64) -> f64 {
        let mut margin = self.config.base_margin;
        if demand_index > HIGH_DEMAND {
            margin += MARGIN_STEP;
        } else if demand_index < LOW_DEMAND {
            margin -= MARGIN_STEP;
        }
        margin.clamp(self.config.min_margin, self.config.max_margin)
    }

    /// Round up to the next multiple of the configured step.
    ///
    /// A value already on a step boundary is returned unchanged. Only
    /// representation noise (a few ulps) counts as "on the boundary"; any
    /// real excess rounds up.
    pub fn round_up(&self, value: f64) -> f64 {
        let step = self.config.rounding_step;
        let steps = value / step;
        let nearest = steps.round();
        if (steps - nearest).abs() <= SNAP_ULPS * f64::EPSILON * nearest.abs().max(1.0) {
            return nearest * step;
        }
        steps.ceil() * step
    }

    fn class_for(&self, job: &Job) -> ResolvedClass {
        resolve_class(job, &self.config).unwrap_or_else(|| ResolvedClass {
            name: self.config.default_class.clone(),
            cost: self.default_cost,
            defaulted: true,
        })
    }
}

fn confidence(total_adjustment: f64, distance_estimated: bool, class_defaulted: bool) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if total_adjustment < EXPECTED_ADJUSTMENT.0 || total_adjustment > EXPECTED_ADJUSTMENT.1 {
        confidence -= 0.1;
    }
    if distance_estimated {
        confidence -= 0.1;
    }
    if class_defaulted {
        confidence -= 0.05;
    }
    confidence.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightgrid_state::Location;
    use proptest::prelude::*;

    fn engine_with_margin(margin: f64) -> PricingEngine {
        let config = PricingConfig {
            base_margin: margin,
            ..PricingConfig::default()
        };
        PricingEngine::new(config).unwrap()
    }

    fn job(distance: f64, class: &str) -> Job {
        let mut job = Job::new(
            "j1",
            Location::new("Paris", "75", None),
            Location::new("Lyon", "69", None),
        );
        job.distance_km = Some(distance);
        job.resource_class = Some(class.to_string());
        job
    }

    #[test]
    fn reference_scenario_prices_at_180() {
        let engine = engine_with_margin(0.10);
        let market = MarketSnapshot::neutral(0, 1.80);

        let quote = engine.price(&job(100.0, "PL"), &market);
        let b = &quote.breakdown;

        assert!((b.base_cost - 158.4615).abs() < 1e-3);
        assert!((b.total_adjustment - 1.0).abs() < 1e-12);
        assert!((b.adjusted_cost - b.base_cost).abs() < 1e-9);
        assert!((b.margin - 0.10).abs() < 1e-12);
        assert_eq!(quote.amount, 180.0);
        assert!((b.platform_share - 18.0).abs() < 1e-9);
        assert!((b.provider_share - 162.0).abs() < 1e-9);
        assert!((quote.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn margin_moves_with_demand() {
        let engine = engine_with_margin(0.15);
        assert!((engine.dynamic_margin(0.8) - 0.17).abs() < 1e-12);
        assert!((engine.dynamic_margin(0.2) - 0.13).abs() < 1e-12);
        assert!((engine.dynamic_margin(0.5) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PricingConfig {
            base_margin: 0.5,
            ..PricingConfig::default()
        };
        assert!(PricingEngine::new(config).is_err());
    }

    #[test]
    fn margin_always_within_bounds() {
        for base in [0.05, 0.10, 0.24, 0.25] {
            let engine = engine_with_margin(base);
            for i in 0..=100 {
                let m = engine.dynamic_margin(f64::from(i) / 100.0);
                assert!((0.05..=0.25).contains(&m), "margin {m} for base {base}");
            }
        }
    }

    #[test]
    fn rounding_is_idempotent() {
        let engine = engine_with_margin(0.10);
        for v in [0.01, 9.99, 10.0, 176.07, 1234.5, 99_999.9] {
            let once = engine.round_up(v);
            assert!(once >= v);
            assert_eq!(engine.round_up(once), once);
            assert_eq!(once % 10.0, 0.0);
        }
    }

    #[test]
    fn rounding_never_drops_below_the_input() {
        let engine = engine_with_margin(0.10);
        assert_eq!(engine.round_up(180.0), 180.0);
        assert_eq!(engine.round_up(180.000_000_001), 190.0);
        assert_eq!(engine.round_up(170.000_01), 180.0);
        // (0.1 + 0.2) * 100 carries representation noise above 30.
        assert_eq!(engine.round_up((0.1 + 0.2) * 100.0), 30.0);
    }

    #[test]
    fn urgent_job_costs_more() {
        let engine = engine_with_margin(0.10);
        let market = MarketSnapshot::neutral(0, 1.80);
        let normal = engine.price(&job(300.0, "PL"), &market);
        let mut urgent_job = job(300.0, "PL");
        urgent_job.urgent = true;
        let urgent = engine.price(&urgent_job, &market);

        assert!(urgent.amount > normal.amount);
        assert_eq!(urgent.breakdown.urgency_factor, 1.25);
        // 1.25 sits outside the expected band.
        assert!((urgent.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn estimated_inputs_lower_confidence() {
        let engine = engine_with_margin(0.10);
        let market = MarketSnapshot::neutral(0, 1.80);
        let bare = Job::new("j2", Location::default(), Location::default());

        let quote = engine.price(&bare, &market);
        assert!(quote.breakdown.distance_estimated);
        assert!(quote.breakdown.class_defaulted);
        assert_eq!(quote.breakdown.resource_class, "PL");
        assert!((quote.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn breakdown_is_internally_consistent() {
        let engine = engine_with_margin(0.15);
        let market = MarketSnapshot {
            timestamp: 0,
            demand_index: 0.8,
            supply_index: 0.3,
            fuel_price: 2.0,
            traffic_index: 0.6,
            weather_alerts: 1,
        };
        let q = engine.price(&job(640.0, "SPL"), &market);
        let b = &q.breakdown;

        let base = b.distance_cost + b.time_cost + b.day_surcharge;
        assert!((b.base_cost - base).abs() < 1e-9);
        let total = b.fuel_factor * b.demand_factor * b.traffic_factor * b.weather_factor
            * b.urgency_factor;
        assert!((b.total_adjustment - total).abs() < 1e-12);
        assert!((b.adjusted_cost - b.base_cost * b.total_adjustment).abs() < 1e-9);
        assert!((b.unrounded_price - b.adjusted_cost / (1.0 - b.margin)).abs() < 1e-9);
        assert!(q.amount >= b.unrounded_price);
        assert!((b.platform_share + b.provider_share - q.amount).abs() < 1e-9);
    }

    prop_compose! {
        fn margin_bounds()(min in 0.0f64..0.3)(
            min in Just(min),
            max in min..0.99,
            base_frac in 0.0f64..=1.0,
        ) -> (f64, f64, f64) {
            (min, (min + (max - min) * base_frac).clamp(min, max), max)
        }
    }

    proptest! {
        #[test]
        fn margin_stays_clamped_for_any_market(
            (min, base, max) in margin_bounds(),
            demand in 0.0f64..=1.0,
        ) {
            let engine = PricingEngine::new(PricingConfig {
                min_margin: min,
                base_margin: base,
                max_margin: max,
                ..PricingConfig::default()
            })
            .unwrap();
            let m = engine.dynamic_margin(demand);
            prop_assert!(m >= min && m <= max, "margin {} outside [{}, {}]", m, min, max);
        }

        #[test]
        fn rounding_up_twice_changes_nothing(
            value in 0.0f64..1_000_000.0,
            step in prop::sample::select(vec![1.0, 5.0, 10.0, 25.0, 50.0]),
        ) {
            let engine = PricingEngine::new(PricingConfig {
                rounding_step: step,
                ..PricingConfig::default()
            })
            .unwrap();
            let once = engine.round_up(value);
            prop_assert!(once >= value);
            prop_assert!(once - value < step);
            prop_assert_eq!(engine.round_up(once), once);
        }
    }
}
