pub mod config;

pub use config::{
    ClassCost, ConfigError, FreightConfig, MarketConfig, MatchingConfig, MatchingWeights,
    PricingConfig, ReliabilityKind, SchedulerConfig, SignalsConfig,
};
