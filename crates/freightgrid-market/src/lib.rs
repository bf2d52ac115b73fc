//! freightgrid-market — the market context provider.
//!
//! Produces one `MarketSnapshot` per cycle from two inputs:
//!
//! - deterministic time-of-day / day-of-week curves (rush hours raise
//!   demand and traffic, nights and weekends lower them)
//! - externally injected values (fuel price, weather alerts, optional
//!   traffic override, demand/supply bias) read through a `SignalFeed`
//!
//! A failing feed surfaces as a `MarketError`; the orchestrator keeps the
//! previous snapshot in that case.

pub mod error;
pub mod feed;
pub mod provider;

pub use error::{MarketError, MarketResult};
pub use feed::{ExternalSignals, ManualFeed, SignalFeed, StaticFeed};
pub use provider::MarketContextProvider;
