//! freight.toml configuration parser.
//!
//! Every section and field has a default, so an empty file yields the
//! stock configuration. `validate()` is strict: out-of-range values are
//! reported, never clamped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FreightConfig {
    pub scheduler: SchedulerConfig,
    pub matching: MatchingConfig,
    pub pricing: PricingConfig,
    pub market: MarketConfig,
}

/// How a unit's success rate is folded over its runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityKind {
    /// Plain running mean over the unit's lifetime.
    #[default]
    RunningMean,
    /// Exponentially weighted moving average using `reliability_alpha`.
    Ewma,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub cycle_interval_ms: u64,
    /// Reserved. Units always run sequentially.
    pub max_concurrent_units: u32,
    /// Per-unit execution budget. Zero disables the timeout.
    pub unit_timeout_ms: u64,
    pub reliability: ReliabilityKind,
    pub reliability_alpha: f64,
    /// Multiplier applied to a unit's success rate on a failed run.
    pub failure_penalty: f64,
    /// Success rate above which a unit gains one priority point.
    pub promote_above: f64,
    /// Success rate below which a unit loses one priority point.
    pub demote_below: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 60_000,
            max_concurrent_units: 1,
            unit_timeout_ms: 30_000,
            reliability: ReliabilityKind::RunningMean,
            reliability_alpha: 0.2,
            failure_penalty: 0.9,
            promote_above: 0.9,
            demote_below: 0.7,
        }
    }
}

/// Factor weights for the match score. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingWeights {
    pub proximity: f64,
    pub capability: f64,
    pub history: f64,
    pub availability: f64,
    pub reputation: f64,
    pub route: f64,
}

impl Default for MatchingWeights {
    fn default() -> Self {
        Self {
            proximity: 0.25,
            capability: 0.20,
            history: 0.20,
            availability: 0.15,
            reputation: 0.10,
            route: 0.10,
        }
    }
}

impl MatchingWeights {
    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("proximity", self.proximity),
            ("capability", self.capability),
            ("history", self.history),
            ("availability", self.availability),
            ("reputation", self.reputation),
            ("route", self.route),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    pub min_match_score: f64,
    pub max_matches_per_cycle: usize,
    /// Minimum score for a return opportunity to be attached to a pair.
    pub return_min_score: f64,
    /// Distance at which the proximity factor reaches zero.
    pub proximity_radius_km: f64,
    /// Fraction of the score removed at risk score 1.0.
    pub risk_penalty: f64,
    /// Resource classes ordered by increasing capacity.
    pub class_hierarchy: Vec<String>,
    pub weights: MatchingWeights,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_match_score: 0.70,
            max_matches_per_cycle: 20,
            return_min_score: 0.6,
            proximity_radius_km: 100.0,
            risk_penalty: 0.2,
            class_hierarchy: vec!["VL".to_string(), "PL".to_string(), "SPL".to_string()],
            weights: MatchingWeights::default(),
        }
    }
}

/// Base cost parameters for one resource class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClassCost {
    pub per_km: f64,
    pub per_hour: f64,
    pub avg_speed_kmh: f64,
    /// Charged once per whole 8-hour day when a trip runs longer than 8 hours.
    #[serde(default)]
    pub per_day_surcharge: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    pub base_margin: f64,
    pub min_margin: f64,
    pub max_margin: f64,
    pub reference_fuel_price: f64,
    pub default_class: String,
    /// Road distance over great-circle distance.
    pub detour_factor: f64,
    /// Distance assumed when neither a declared distance nor coordinates exist.
    pub fallback_distance_km: f64,
    pub rounding_step: f64,
    pub cost_table: BTreeMap<String, ClassCost>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut cost_table = BTreeMap::new();
        cost_table.insert(
            "VL".to_string(),
            ClassCost {
                per_km: 0.90,
                per_hour: 22.0,
                avg_speed_kmh: 75.0,
                per_day_surcharge: 120.0,
            },
        );
        cost_table.insert(
            "PL".to_string(),
            ClassCost {
                per_km: 1.20,
                per_hour: 25.0,
                avg_speed_kmh: 65.0,
                per_day_surcharge: 150.0,
            },
        );
        cost_table.insert(
            "SPL".to_string(),
            ClassCost {
                per_km: 1.50,
                per_hour: 28.0,
                avg_speed_kmh: 60.0,
                per_day_surcharge: 180.0,
            },
        );
        Self {
            base_margin: 0.15,
            min_margin: 0.05,
            max_margin: 0.25,
            reference_fuel_price: 1.80,
            default_class: "PL".to_string(),
            detour_factor: 1.2,
            fallback_distance_km: 50.0,
            rounding_step: 10.0,
            cost_table,
        }
    }
}

/// Externally injected market values used by the static signal feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalsConfig {
    pub fuel_price: f64,
    pub weather_alerts: u32,
    /// Overrides the time-of-day traffic curve when set.
    pub traffic_index: Option<f64>,
    pub demand_bias: f64,
    pub supply_bias: f64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            fuel_price: 1.80,
            weather_alerts: 0,
            traffic_index: None,
            demand_bias: 0.0,
            supply_bias: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketConfig {
    /// Demand added during weekday rush hours (07-09h, 16-19h UTC).
    pub rush_hour_boost: f64,
    /// Demand removed overnight (22-05h UTC).
    pub night_dip: f64,
    /// Demand removed on Saturdays and Sundays.
    pub weekend_dip: f64,
    pub signals: SignalsConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rush_hour_boost: 0.2,
            night_dip: 0.2,
            weekend_dip: 0.1,
            signals: SignalsConfig::default(),
        }
    }
}

impl FreightConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FreightConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every bound. The first violation found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.matching.validate()?;
        self.pricing.validate()?;
        self.market.validate()?;
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")));
    }
    Ok(())
}

fn check_finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(field, format!("{value} is not a finite number")));
    }
    Ok(())
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "scheduler.cycle_interval_ms",
                "must be greater than zero",
            ));
        }
        if !(self.reliability_alpha > 0.0 && self.reliability_alpha <= 1.0) {
            return Err(ConfigError::invalid(
                "scheduler.reliability_alpha",
                format!("{} is outside (0, 1]", self.reliability_alpha),
            ));
        }
        if !(self.failure_penalty > 0.0 && self.failure_penalty <= 1.0) {
            return Err(ConfigError::invalid(
                "scheduler.failure_penalty",
                format!("{} is outside (0, 1]", self.failure_penalty),
            ));
        }
        check_unit_interval("scheduler.promote_above", self.promote_above)?;
        check_unit_interval("scheduler.demote_below", self.demote_below)?;
        if self.demote_below > self.promote_above {
            return Err(ConfigError::invalid(
                "scheduler.demote_below",
                "must not exceed promote_above",
            ));
        }
        Ok(())
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("matching.min_match_score", self.min_match_score)?;
        check_unit_interval("matching.return_min_score", self.return_min_score)?;
        check_unit_interval("matching.risk_penalty", self.risk_penalty)?;
        if self.max_matches_per_cycle == 0 {
            return Err(ConfigError::invalid(
                "matching.max_matches_per_cycle",
                "must be greater than zero",
            ));
        }
        check_finite("matching.proximity_radius_km", self.proximity_radius_km)?;
        if self.proximity_radius_km <= 0.0 {
            return Err(ConfigError::invalid(
                "matching.proximity_radius_km",
                "must be positive",
            ));
        }
        if self.class_hierarchy.is_empty() {
            return Err(ConfigError::invalid(
                "matching.class_hierarchy",
                "must list at least one class",
            ));
        }
        let mut seen = HashSet::new();
        for class in &self.class_hierarchy {
            if !seen.insert(class.as_str()) {
                return Err(ConfigError::invalid(
                    "matching.class_hierarchy",
                    format!("duplicate class {class}"),
                ));
            }
        }

        let mut sum = 0.0;
        for (name, weight) in self.weights.entries() {
            check_unit_interval(&format!("matching.weights.{name}"), weight)?;
            sum += weight;
        }
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::invalid(
                "matching.weights",
                format!("weights sum to {sum:.4}, expected 1.0"),
            ));
        }
        Ok(())
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pricing.base_margin", self.base_margin),
            ("pricing.min_margin", self.min_margin),
            ("pricing.max_margin", self.max_margin),
            ("pricing.reference_fuel_price", self.reference_fuel_price),
            ("pricing.detour_factor", self.detour_factor),
            ("pricing.fallback_distance_km", self.fallback_distance_km),
            ("pricing.rounding_step", self.rounding_step),
        ] {
            check_finite(field, value)?;
        }
        if self.min_margin < 0.0 {
            return Err(ConfigError::invalid("pricing.min_margin", "must not be negative"));
        }
        if self.max_margin >= 1.0 {
            return Err(ConfigError::invalid("pricing.max_margin", "must be below 1.0"));
        }
        if self.min_margin > self.max_margin {
            return Err(ConfigError::invalid(
                "pricing.min_margin",
                "must not exceed max_margin",
            ));
        }
        if self.base_margin < self.min_margin || self.base_margin > self.max_margin {
            return Err(ConfigError::invalid(
                "pricing.base_margin",
                format!(
                    "{} is outside [{}, {}]",
                    self.base_margin, self.min_margin, self.max_margin
                ),
            ));
        }
        if self.reference_fuel_price <= 0.0 {
            return Err(ConfigError::invalid(
                "pricing.reference_fuel_price",
                "must be positive",
            ));
        }
        if self.detour_factor < 1.0 {
            return Err(ConfigError::invalid("pricing.detour_factor", "must be at least 1.0"));
        }
        if self.fallback_distance_km <= 0.0 {
            return Err(ConfigError::invalid(
                "pricing.fallback_distance_km",
                "must be positive",
            ));
        }
        if self.rounding_step <= 0.0 {
            return Err(ConfigError::invalid("pricing.rounding_step", "must be positive"));
        }
        for (class, cost) in &self.cost_table {
            for (name, value) in [
                ("per_km", cost.per_km),
                ("per_hour", cost.per_hour),
                ("avg_speed_kmh", cost.avg_speed_kmh),
                ("per_day_surcharge", cost.per_day_surcharge),
            ] {
                check_finite(&format!("pricing.cost_table.{class}.{name}"), value)?;
            }
            if cost.avg_speed_kmh <= 0.0 {
                return Err(ConfigError::invalid(
                    &format!("pricing.cost_table.{class}.avg_speed_kmh"),
                    "must be positive",
                ));
            }
            if cost.per_km < 0.0 || cost.per_hour < 0.0 || cost.per_day_surcharge < 0.0 {
                return Err(ConfigError::invalid(
                    &format!("pricing.cost_table.{class}"),
                    "rates must not be negative",
                ));
            }
        }
        if !self.cost_table.contains_key(&self.default_class) {
            return Err(ConfigError::invalid(
                "pricing.default_class",
                format!("{} has no cost table entry", self.default_class),
            ));
        }
        Ok(())
    }
}

impl MarketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("market.rush_hour_boost", self.rush_hour_boost)?;
        check_unit_interval("market.night_dip", self.night_dip)?;
        check_unit_interval("market.weekend_dip", self.weekend_dip)?;
        check_finite("market.signals.fuel_price", self.signals.fuel_price)?;
        check_finite("market.signals.demand_bias", self.signals.demand_bias)?;
        check_finite("market.signals.supply_bias", self.signals.supply_bias)?;
        if self.signals.fuel_price <= 0.0 {
            return Err(ConfigError::invalid(
                "market.signals.fuel_price",
                "must be positive",
            ));
        }
        if let Some(traffic) = self.signals.traffic_index {
            check_unit_interval("market.signals.traffic_index", traffic)?;
        }
        Ok(())
    }
}
