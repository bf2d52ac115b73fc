//! freightgrid-pricing — cost-plus-market pricing for transport jobs.
//!
//! # Pricing Algorithm
//!
//! ```text
//! distance      = job.distance_km
//!                 | haversine(pickup, delivery) * detour_factor
//!                 | fallback_distance_km
//! hours         = distance / avg_speed
//! base_cost     = per_km * distance + per_hour * hours
//!                 + per_day_surcharge * floor(hours / 8)   (only when hours > 8)
//! adjustment    = fuel * demand * traffic * weather * urgency
//! adjusted_cost = base_cost * adjustment
//! margin        = clamp(base_margin ± 0.02 by demand, min_margin, max_margin)
//! price         = ceil(adjusted_cost / (1 - margin) / step) * step
//! ```
//!
//! The full breakdown is attached to every quote.

pub mod adjust;
pub mod cost;
pub mod engine;
pub mod unit;

pub use adjust::Adjustments;
pub use cost::{BaseCost, ResolvedClass};
pub use engine::PricingEngine;
pub use unit::{PRICING_UNIT_NAME, PRICING_UNIT_PRIORITY, PricingUnit};
