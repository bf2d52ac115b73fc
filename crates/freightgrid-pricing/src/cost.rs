//! Base cost model: distance resolution and per-class rates.

use freight_core::{ClassCost, PricingConfig};
use freightgrid_state::{Job, haversine_km};

/// Hours in a driving day. Trips longer than this pay a day surcharge.
const DRIVING_DAY_HOURS: f64 = 8.0;

/// The resource class a job will be priced as.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClass {
    pub name: String,
    pub cost: ClassCost,
    /// True when the job's class was missing or unknown.
    pub defaulted: bool,
}

/// Components of the unadjusted cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseCost {
    pub duration_hours: f64,
    pub distance_cost: f64,
    pub time_cost: f64,
    pub extra_days: u32,
    pub day_surcharge: f64,
}

impl BaseCost {
    pub fn compute(distance_km: f64, cost: &ClassCost) -> Self {
        let duration_hours = distance_km / cost.avg_speed_kmh;
        let extra_days = if duration_hours > DRIVING_DAY_HOURS {
            (duration_hours / DRIVING_DAY_HOURS).floor() as u32
        } else {
            0
        };
        Self {
            duration_hours,
            distance_cost: cost.per_km * distance_km,
            time_cost: cost.per_hour * duration_hours,
            extra_days,
            day_surcharge: cost.per_day_surcharge * f64::from(extra_days),
        }
    }

    pub fn total(&self) -> f64 {
        self.distance_cost + self.time_cost + self.day_surcharge
    }
}

/// Declared distance, else great-circle distance times the detour factor,
/// else the configured fallback. The flag is true for anything estimated.
pub fn resolve_distance(job: &Job, config: &PricingConfig) -> (f64, bool) {
    if let Some(d) = job.distance_km
        && d.is_finite()
        && d > 0.0
    {
        return (d, false);
    }
    match (job.pickup.point, job.delivery.point) {
        (Some(a), Some(b)) => (haversine_km(a, b) * config.detour_factor, true),
        _ => (config.fallback_distance_km, true),
    }
}

/// Look up the job's class in the cost table, falling back to the default.
///
/// Returns `None` only if the default class itself is missing, which
/// config validation rules out.
pub fn resolve_class(job: &Job, config: &PricingConfig) -> Option<ResolvedClass> {
    if let Some(class) = job.resource_class.as_deref()
        && let Some(cost) = config.cost_table.get(class)
    {
        return Some(ResolvedClass {
            name: class.to_string(),
            cost: *cost,
            defaulted: false,
        });
    }
    config
        .cost_table
        .get(&config.default_class)
        .map(|cost| ResolvedClass {
            name: config.default_class.clone(),
            cost: *cost,
            defaulted: true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightgrid_state::{GeoPoint, Location};

    fn pl() -> ClassCost {
        PricingConfig::default().cost_table["PL"]
    }

    fn job_between(a: Option<GeoPoint>, b: Option<GeoPoint>) -> Job {
        Job::new(
            "j1",
            Location::new("Paris", "75", a),
            Location::new("Lyon", "69", b),
        )
    }

    #[test]
    fn base_cost_short_trip() {
        let base = BaseCost::compute(100.0, &pl());
        assert!((base.distance_cost - 120.0).abs() < 1e-9);
        assert!((base.time_cost - 25.0 * 100.0 / 65.0).abs() < 1e-9);
        assert_eq!(base.extra_days, 0);
        assert!((base.total() - 158.4615).abs() < 1e-3);
    }

    #[test]
    fn long_trip_pays_day_surcharge() {
        // 1100 km at 65 km/h ≈ 16.9 h → two whole driving days.
        let base = BaseCost::compute(1100.0, &pl());
        assert_eq!(base.extra_days, 2);
        assert!((base.day_surcharge - 300.0).abs() < 1e-9);
    }

    #[test]
    fn exactly_eight_hours_has_no_surcharge() {
        let base = BaseCost::compute(8.0 * 65.0, &pl());
        assert_eq!(base.extra_days, 0);
    }

    #[test]
    fn declared_distance_wins() {
        let mut job = job_between(None, None);
        job.distance_km = Some(250.0);
        assert_eq!(resolve_distance(&job, &PricingConfig::default()), (250.0, false));
    }

    #[test]
    fn coordinates_estimate_with_detour() {
        let paris = GeoPoint { lat: 48.8566, lng: 2.3522 };
        let lyon = GeoPoint { lat: 45.7640, lng: 4.8357 };
        let job = job_between(Some(paris), Some(lyon));
        let (d, estimated) = resolve_distance(&job, &PricingConfig::default());
        assert!(estimated);
        assert!((d - haversine_km(paris, lyon) * 1.2).abs() < 1e-9);
    }

    #[test]
    fn no_distance_information_uses_fallback() {
        let job = job_between(None, None);
        assert_eq!(resolve_distance(&job, &PricingConfig::default()), (50.0, true));
    }

    #[test]
    fn unknown_class_falls_back_to_default() {
        let config = PricingConfig::default();
        let mut job = job_between(None, None);
        job.resource_class = Some("XXL".to_string());
        let class = resolve_class(&job, &config).unwrap();
        assert_eq!(class.name, "PL");
        assert!(class.defaulted);

        job.resource_class = Some("SPL".to_string());
        let class = resolve_class(&job, &config).unwrap();
        assert_eq!(class.name, "SPL");
        assert!(!class.defaulted);
    }
}
