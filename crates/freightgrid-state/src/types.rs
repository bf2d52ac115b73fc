//! Domain types for the FreightGrid cycle state.
//!
//! Jobs and providers are created by external collaborators; the core
//! only prices, matches, and annotates them. All types serialize to JSON
//! so the daemon can seed state from a file.

use serde::{Deserialize, Serialize};

/// Unique identifier for a transport job.
pub type JobId = String;

/// Unique identifier for a resource provider (vehicle / operator).
pub type ProviderId = String;

/// Unique identifier for a matched pair.
pub type PairId = String;

// ── Geography ─────────────────────────────────────────────────────

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A pickup or delivery address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub postal_area: String,
    #[serde(default)]
    pub point: Option<GeoPoint>,
}

impl Location {
    pub fn new(city: &str, postal_area: &str, point: Option<GeoPoint>) -> Self {
        Self {
            city: city.to_string(),
            postal_area: postal_area.to_string(),
            point,
        }
    }

    /// Case-insensitive city comparison, ignoring surrounding whitespace.
    pub fn same_city(&self, other: &Location) -> bool {
        let a = self.city.trim();
        let b = other.city.trim();
        !a.is_empty() && a.eq_ignore_ascii_case(b)
    }
}

// ── Job ───────────────────────────────────────────────────────────

/// Lifecycle status of a job.
///
/// The core moves jobs from `Pending` to `Priced` and `Matched`; the
/// terminal states are set by external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Priced,
    Matched,
    Accepted,
    Rejected,
    Completed,
}

/// A transport request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub pickup: Location,
    pub delivery: Location,
    /// Required resource class (e.g. "VL", "PL", "SPL").
    #[serde(default)]
    pub resource_class: Option<String>,
    /// Declared road distance in kilometers.
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub quote: Option<PriceQuote>,
    #[serde(default)]
    pub assigned_provider: Option<ProviderId>,
    /// Unix timestamp (seconds) of the match.
    #[serde(default)]
    pub matched_at: Option<u64>,
}

impl Job {
    pub fn new(id: &str, pickup: Location, delivery: Location) -> Self {
        Self {
            id: id.to_string(),
            pickup,
            delivery,
            resource_class: None,
            distance_km: None,
            urgent: false,
            status: JobStatus::Pending,
            quote: None,
            assigned_provider: None,
            matched_at: None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        self.quote.as_ref().map(|q| q.amount)
    }

    pub fn is_matched(&self) -> bool {
        self.assigned_provider.is_some()
    }

    /// Waiting for a provider: pending or priced, with no active match.
    pub fn is_open(&self) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Priced) && !self.is_matched()
    }

    /// Open and without a price yet.
    pub fn needs_price(&self) -> bool {
        self.is_open() && self.quote.is_none()
    }

    /// Attach a price and move a pending job to `Priced`.
    pub fn apply_quote(&mut self, quote: PriceQuote) {
        self.quote = Some(quote);
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Priced;
        }
    }

    /// Record a match. Keeps the matched flag, provider reference, and
    /// timestamp in step.
    pub fn assign(&mut self, provider_id: &str, at: u64) {
        self.assigned_provider = Some(provider_id.to_string());
        self.matched_at = Some(at);
        self.status = JobStatus::Matched;
    }
}

// ── Pricing output ────────────────────────────────────────────────

/// Every intermediate quantity of a price computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceBreakdown {
    pub distance_km: f64,
    /// True when the distance came from coordinates or the fallback.
    pub distance_estimated: bool,
    pub resource_class: String,
    /// True when the job carried no resource class.
    pub class_defaulted: bool,
    pub duration_hours: f64,
    pub distance_cost: f64,
    pub time_cost: f64,
    pub extra_days: u32,
    pub day_surcharge: f64,
    pub base_cost: f64,
    pub fuel_factor: f64,
    pub demand_factor: f64,
    pub traffic_factor: f64,
    pub weather_factor: f64,
    pub urgency_factor: f64,
    pub total_adjustment: f64,
    pub adjusted_cost: f64,
    pub margin: f64,
    /// Price before rounding to the configured step.
    pub unrounded_price: f64,
    pub platform_share: f64,
    pub provider_share: f64,
}

/// A priced job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceQuote {
    pub amount: f64,
    pub confidence: f64,
    pub breakdown: PriceBreakdown,
}

// ── Provider ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    #[default]
    Active,
    Qualified,
    Unavailable,
}

/// A from-city / to-city pair a provider prefers to run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferredRoute {
    pub from: String,
    pub to: String,
}

/// A capacity holder eligible to be matched with jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: ProviderId,
    #[serde(default)]
    pub status: ProviderStatus,
    #[serde(default)]
    pub position: Option<GeoPoint>,
    /// Resource classes this provider can serve.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Historical success rate in [0, 1].
    #[serde(default)]
    pub success_rate: Option<f64>,
    /// Reputation rating in [0, 5].
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub preferred_routes: Vec<PreferredRoute>,
    /// Known availability; `None` when the provider never reported it.
    #[serde(default)]
    pub available: Option<bool>,
    /// Historical average time to respond to an offer.
    #[serde(default)]
    pub avg_response_minutes: Option<f64>,
    /// Risk score in [0, 1] attached by the external risk collaborator.
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub last_matched_at: Option<u64>,
}

impl Provider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: ProviderStatus::Active,
            position: None,
            capabilities: Vec::new(),
            success_rate: None,
            rating: None,
            preferred_routes: Vec::new(),
            available: None,
            avg_response_minutes: None,
            risk_score: None,
            last_matched_at: None,
        }
    }

    /// Active or qualified providers may be matched.
    pub fn is_eligible(&self) -> bool {
        matches!(self.status, ProviderStatus::Active | ProviderStatus::Qualified)
    }
}

// ── Matching output ───────────────────────────────────────────────

/// Per-factor scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchBreakdown {
    pub proximity: f64,
    pub capability: f64,
    pub history: f64,
    pub availability: f64,
    pub reputation: f64,
    pub route: f64,
    /// Multiplier derived from the provider's risk score (1.0 when unknown).
    pub risk_multiplier: f64,
}

/// A second job starting where the matched job ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnOpportunity {
    pub job_id: JobId,
    pub score: f64,
    pub empty_km_saved: f64,
    pub combined_earnings: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    #[default]
    Proposed,
    Accepted,
    Rejected,
}

/// One job ↔ provider assignment proposed in a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedPair {
    pub id: PairId,
    pub job_id: JobId,
    pub provider_id: ProviderId,
    pub score: f64,
    pub breakdown: MatchBreakdown,
    pub acceptance_probability: f64,
    pub return_opportunity: Option<ReturnOpportunity>,
    pub status: PairStatus,
    /// Cycle number in which the pair was created.
    pub cycle: u64,
    /// Unix timestamp (seconds).
    pub created_at: u64,
}

// ── Market ────────────────────────────────────────────────────────

/// Exogenous market signals for one cycle. Replaced wholesale, never edited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    /// Unix timestamp (seconds).
    pub timestamp: u64,
    pub demand_index: f64,
    pub supply_index: f64,
    pub fuel_price: f64,
    pub traffic_index: f64,
    pub weather_alerts: u32,
}

impl MarketSnapshot {
    /// A balanced market: demand and supply at 0.5, no traffic or alerts.
    pub fn neutral(timestamp: u64, fuel_price: f64) -> Self {
        Self {
            timestamp,
            demand_index: 0.5,
            supply_index: 0.5,
            fuel_price,
            traffic_index: 0.0,
            weather_alerts: 0,
        }
    }
}
