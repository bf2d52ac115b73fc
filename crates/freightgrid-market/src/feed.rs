//! Sources of externally injected market values.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use freight_core::SignalsConfig;

use crate::error::{MarketError, MarketResult};

/// Values the core cannot derive itself. Fetched once per cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExternalSignals {
    pub fuel_price: f64,
    pub weather_alerts: u32,
    /// Replaces the time-of-day traffic curve when present.
    pub traffic_index: Option<f64>,
    pub demand_bias: f64,
    pub supply_bias: f64,
}

impl ExternalSignals {
    /// Reject values the pricing model cannot work with.
    pub fn validate(&self) -> MarketResult<()> {
        if !self.fuel_price.is_finite() || self.fuel_price <= 0.0 {
            return Err(MarketError::InvalidSignal {
                field: "fuel_price",
                value: self.fuel_price,
            });
        }
        if let Some(traffic) = self.traffic_index
            && !(0.0..=1.0).contains(&traffic)
        {
            return Err(MarketError::InvalidSignal {
                field: "traffic_index",
                value: traffic,
            });
        }
        for (field, value) in [("demand_bias", self.demand_bias), ("supply_bias", self.supply_bias)] {
            if !value.is_finite() {
                return Err(MarketError::InvalidSignal { field, value });
            }
        }
        Ok(())
    }
}

impl From<&SignalsConfig> for ExternalSignals {
    fn from(config: &SignalsConfig) -> Self {
        Self {
            fuel_price: config.fuel_price,
            weather_alerts: config.weather_alerts,
            traffic_index: config.traffic_index,
            demand_bias: config.demand_bias,
            supply_bias: config.supply_bias,
        }
    }
}

/// Read-only source of external signals.
pub trait SignalFeed: Send + Sync {
    fn fetch(&self) -> MarketResult<ExternalSignals>;
}

/// Fixed signals, typically from `[market.signals]` in freight.toml.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    signals: ExternalSignals,
}

impl StaticFeed {
    pub fn new(signals: ExternalSignals) -> Self {
        Self { signals }
    }
}

impl SignalFeed for StaticFeed {
    fn fetch(&self) -> MarketResult<ExternalSignals> {
        Ok(self.signals)
    }
}

/// Signals pushed in by an external collaborator between cycles.
///
/// Cloning shares the underlying slot. An empty slot reads as a feed
/// outage.
#[derive(Debug, Clone, Default)]
pub struct ManualFeed {
    slot: Arc<RwLock<Option<ExternalSignals>>>,
}

impl ManualFeed {
    pub fn new(initial: Option<ExternalSignals>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set(&self, signals: Option<ExternalSignals>) -> MarketResult<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|_| MarketError::Feed("signal slot poisoned".to_string()))?;
        *slot = signals;
        Ok(())
    }
}

impl SignalFeed for ManualFeed {
    fn fetch(&self) -> MarketResult<ExternalSignals> {
        let slot = self
            .slot
            .read()
            .map_err(|_| MarketError::Feed("signal slot poisoned".to_string()))?;
        (*slot).ok_or_else(|| MarketError::Feed("no signals published".to_string()))
    }
}
