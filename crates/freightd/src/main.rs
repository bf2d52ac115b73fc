//! freightd — the FreightGrid daemon.
//!
//! Assembles the cycle loop from its parts:
//! - Configuration (freight.toml)
//! - Market context provider with static signals
//! - Cycle state, optionally seeded from a JSON document
//! - Pricing and matching units
//! - Orchestrator with logging and optional Prometheus textfile observers
//!
//! # Usage
//!
//! ```text
//! freightd run --config config/freight.example.toml --seed config/seed.example.json --metrics-file /var/lib/node_exporter/freightgrid.prom
//! freightd run --seed seed.json --cycles 3
//! freightd validate --config freight.toml
//! freightd default-config > freight.toml
//! ```

mod textfile;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use freight_core::FreightConfig;
use freightgrid_market::MarketContextProvider;
use freightgrid_matching::{MatchingEngine, MatchingUnit};
use freightgrid_orchestrator::{Orchestrator, TracingObserver};
use freightgrid_pricing::{PricingEngine, PricingUnit};
use freightgrid_state::{CycleState, MarketSnapshot};

use crate::textfile::TextfileObserver;

const DEFAULT_FILTER: &str = "info,freightd=debug,freightgrid=debug";

#[derive(Parser)]
#[command(name = "freightd", about = "FreightGrid daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the cycle loop until Ctrl-C, or for a fixed number of cycles.
    Run {
        /// Path to freight.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON document with initial jobs and providers.
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Run this many cycles, then print metrics and exit.
        #[arg(long)]
        cycles: Option<u64>,

        /// Write Prometheus metrics to this file after every cycle.
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },

    /// Check a configuration file and exit.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },

    /// Print the default configuration as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            seed,
            cycles,
            metrics_file,
        } => run(config.as_deref(), seed.as_deref(), cycles, metrics_file).await,
        Command::Validate { config } => {
            let config = load_config(Some(&config))?;
            config.validate()?;
            println!("configuration OK");
            Ok(())
        }
        Command::DefaultConfig => {
            print!("{}", FreightConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<FreightConfig> {
    match path {
        Some(path) => FreightConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(FreightConfig::default()),
    }
}

fn load_state(seed: Option<&Path>, market: MarketSnapshot) -> anyhow::Result<CycleState> {
    let Some(path) = seed else {
        return Ok(CycleState::new(market));
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed from {}", path.display()))?;
    let state = CycleState::from_seed_json(&json, market)
        .with_context(|| format!("parsing seed from {}", path.display()))?;
    info!(
        path = %path.display(),
        jobs = state.job_count(),
        providers = state.provider_count(),
        "state seeded"
    );
    Ok(state)
}

/// Wire config, state, and units into an orchestrator.
async fn build(config: &FreightConfig, seed: Option<&Path>) -> anyhow::Result<Orchestrator> {
    config.validate()?;

    let market = MarketContextProvider::from_config(&config.market);
    let initial = market.refresh().unwrap_or_else(|e| {
        warn!(error = %e, "initial market refresh failed, starting from a neutral market");
        MarketSnapshot::neutral(epoch_secs(), config.market.signals.fuel_price)
    });
    let state = load_state(seed, initial)?;

    let orch = Orchestrator::new(config.scheduler.clone(), market, state)?;
    orch.register_unit(PricingUnit::new(PricingEngine::new(config.pricing.clone())?))
        .await?;
    orch.register_unit(MatchingUnit::new(MatchingEngine::new(config.matching.clone())?))
        .await?;
    orch.add_observer(Arc::new(TracingObserver)).await;
    Ok(orch)
}

async fn run(
    config_path: Option<&Path>,
    seed: Option<&Path>,
    cycles: Option<u64>,
    metrics_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("FreightGrid daemon starting");

    let config = load_config(config_path)?;
    let orch = build(&config, seed).await?;
    if let Some(path) = metrics_file {
        info!(path = %path.display(), "writing Prometheus textfile after each cycle");
        orch.add_observer(Arc::new(TextfileObserver::new(path))).await;
    }

    match cycles {
        Some(n) => {
            let interval = Duration::from_millis(config.scheduler.cycle_interval_ms);
            tokio::select! {
                _ = run_cycles(&orch, n, interval) => {}
                res = tokio::signal::ctrl_c() => {
                    res?;
                    info!("shutdown signal received");
                }
            }
        }
        None => {
            orch.start().await;
            tokio::signal::ctrl_c().await?;
            info!("shutdown signal received");
            orch.stop().await;
        }
    }

    let metrics = orch.metrics().await;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    info!(cycles = metrics.cycle_count, "FreightGrid daemon stopped");
    Ok(())
}

async fn run_cycles(orch: &Orchestrator, n: u64, interval: Duration) {
    for i in 0..n {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        orch.run_cycle().await;
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
