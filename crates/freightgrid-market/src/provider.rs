//! Market context provider — turns the clock and external signals into a
//! `MarketSnapshot`.
//!
//! All curves use UTC. Weekdays are Monday through Friday.
//!
//! ```text
//! demand  = 0.5 + rush_hour_boost (weekday 07-09h, 16-19h)
//!               - night_dip       (22-05h)
//!               - weekend_dip     (Sat, Sun)
//!               + demand_bias
//! supply  = 0.5 - rush_hour_boost / 2 (rush hours)
//!               + night_dip / 2       (night)
//!               + supply_bias
//! traffic = signal override, else 0.7 rush / 0.4 day / 0.3 evening / 0.1 night,
//!           scaled by 0.6 on weekends
//! ```

use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::debug;

use freight_core::MarketConfig;
use freightgrid_state::MarketSnapshot;

use crate::error::MarketResult;
use crate::feed::{ExternalSignals, SignalFeed, StaticFeed};

/// Where in the week a moment falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClockPosition {
    hour: u32,
    /// 1 = Monday … 7 = Sunday.
    weekday: u32,
}

impl ClockPosition {
    fn at(at: DateTime<Utc>) -> Self {
        Self {
            hour: at.hour(),
            weekday: at.weekday().number_from_monday(),
        }
    }

    fn is_weekend(&self) -> bool {
        self.weekday >= 6
    }

    fn is_rush_hour(&self) -> bool {
        !self.is_weekend() && ((7..9).contains(&self.hour) || (16..19).contains(&self.hour))
    }

    fn is_night(&self) -> bool {
        self.hour >= 22 || self.hour < 5
    }
}

pub struct MarketContextProvider {
    config: MarketConfig,
    feed: Arc<dyn SignalFeed>,
}

impl MarketContextProvider {
    pub fn new(config: MarketConfig, feed: Arc<dyn SignalFeed>) -> Self {
        Self { config, feed }
    }

    /// Provider backed by the static `[market.signals]` values.
    pub fn from_config(config: &MarketConfig) -> Self {
        let feed = StaticFeed::new(ExternalSignals::from(&config.signals));
        Self::new(config.clone(), Arc::new(feed))
    }

    /// Snapshot for the current wall-clock time.
    pub fn refresh(&self) -> MarketResult<MarketSnapshot> {
        self.snapshot_at(Utc::now())
    }

    /// Snapshot for an arbitrary moment. Pure apart from the feed read.
    pub fn snapshot_at(&self, at: DateTime<Utc>) -> MarketResult<MarketSnapshot> {
        let signals = self.feed.fetch()?;
        signals.validate()?;

        let clock = ClockPosition::at(at);
        let snapshot = MarketSnapshot {
            timestamp: u64::try_from(at.timestamp()).unwrap_or_default(),
            demand_index: self.demand(clock, &signals),
            supply_index: self.supply(clock, &signals),
            fuel_price: signals.fuel_price,
            traffic_index: signals.traffic_index.unwrap_or_else(|| traffic_curve(clock)),
            weather_alerts: signals.weather_alerts,
        };

        debug!(
            hour = clock.hour,
            weekday = clock.weekday,
            demand = snapshot.demand_index,
            supply = snapshot.supply_index,
            traffic = snapshot.traffic_index,
            "market snapshot computed"
        );
        Ok(snapshot)
    }

    fn demand(&self, clock: ClockPosition, signals: &ExternalSignals) -> f64 {
        let mut demand = 0.5;
        if clock.is_rush_hour() {
            demand += self.config.rush_hour_boost;
        }
        if clock.is_night() {
            demand -= self.config.night_dip;
        }
        if clock.is_weekend() {
            demand -= self.config.weekend_dip;
        }
        (demand + signals.demand_bias).clamp(0.0, 1.0)
    }

    fn supply(&self, clock: ClockPosition, signals: &ExternalSignals) -> f64 {
        let mut supply = 0.5;
        if clock.is_rush_hour() {
            supply -= self.config.rush_hour_boost / 2.0;
        }
        if clock.is_night() {
            supply += self.config.night_dip / 2.0;
        }
        (supply + signals.supply_bias).clamp(0.0, 1.0)
    }
}

fn traffic_curve(clock: ClockPosition) -> f64 {
    let base = if clock.is_night() {
        0.1
    } else if (7..9).contains(&clock.hour) || (16..19).contains(&clock.hour) {
        0.7
    } else if (9..16).contains(&clock.hour) {
        0.4
    } else {
        0.3
    };
    if clock.is_weekend() { base * 0.6 } else { base }
}
