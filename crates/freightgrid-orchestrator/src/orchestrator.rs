//! The orchestrator: unit registry and cycle loop.
//!
//! One cycle:
//! 1. refresh the market snapshot (keep the previous one on failure)
//! 2. run every unit in descending priority, registration order on ties
//! 3. record duration and outcome per unit; failures, timeouts, and panics
//!    never abort the cycle
//! 4. derive insights from the final state
//! 5. retune priorities from success rates
//! 6. notify observers
//!
//! The loop spawned by `start()` then sleeps for `cycle_interval_ms` or
//! until `stop()` is called. `stop()` never interrupts a running cycle.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use freight_core::SchedulerConfig;
use freightgrid_market::MarketContextProvider;
use freightgrid_state::{CycleState, SchedulingUnit, UnitError};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::insights::{Insight, derive_insights};
use crate::metrics::{ErrorEvent, ErrorRing, OrchestratorMetrics, UnitMetrics};
use crate::observer::CycleObserver;
use crate::reliability::{MAX_PRIORITY, ReliabilityStrategy, tune_priority};

struct RegisteredUnit {
    unit: Box<dyn SchedulingUnit>,
    priority: u8,
    /// Registration order, used to break priority ties.
    seq: u64,
}

/// Everything the orchestrator writes about its own runs.
#[derive(Default)]
struct Ledger {
    cycle_count: u64,
    units: BTreeMap<String, UnitMetrics>,
    errors: ErrorRing,
    market_stale: bool,
    last_cycle_duration_ms: u64,
}

struct Inner {
    config: SchedulerConfig,
    strategy: ReliabilityStrategy,
    market: MarketContextProvider,
    units: Mutex<Vec<RegisteredUnit>>,
    state: Mutex<CycleState>,
    ledger: RwLock<Ledger>,
    observers: RwLock<Vec<Arc<dyn CycleObserver>>>,
    next_seq: AtomicU64,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Result of one unit execution within a cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitRun {
    pub unit: String,
    pub priority: u8,
    pub duration_ms: u64,
    pub success: bool,
    pub summary: Option<String>,
    pub error: Option<String>,
}

/// What happened in one cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub duration_ms: u64,
    pub market_stale: bool,
    /// In execution order.
    pub runs: Vec<UnitRun>,
    pub insights: Vec<Insight>,
}

/// Cheap to clone; all clones drive the same loop and state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Validate the scheduler config and take ownership of the state.
    pub fn new(
        config: SchedulerConfig,
        market: MarketContextProvider,
        state: CycleState,
    ) -> OrchestratorResult<Self> {
        config.validate()?;
        if config.max_concurrent_units > 1 {
            warn!(
                max_concurrent_units = config.max_concurrent_units,
                "max_concurrent_units is reserved; units run one at a time"
            );
        }

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(Inner {
                strategy: ReliabilityStrategy::from_config(&config),
                config,
                market,
                units: Mutex::new(Vec::new()),
                state: Mutex::new(state),
                ledger: RwLock::new(Ledger::default()),
                observers: RwLock::new(Vec::new()),
                next_seq: AtomicU64::new(0),
                running: AtomicBool::new(false),
                shutdown,
                task: Mutex::new(None),
            }),
        })
    }

    /// Add a unit. Names are unique and priorities lie in 0..=100.
    pub async fn register_unit<U>(&self, unit: U) -> OrchestratorResult<()>
    where
        U: SchedulingUnit + 'static,
    {
        let name = unit.name().to_string();
        let priority = unit.priority();
        if priority > MAX_PRIORITY {
            return Err(OrchestratorError::InvalidPriority { name, priority });
        }

        let mut units = self.inner.units.lock().await;
        if units.iter().any(|r| r.unit.name() == name) {
            return Err(OrchestratorError::DuplicateUnit(name));
        }
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        units.push(RegisteredUnit {
            unit: Box::new(unit),
            priority,
            seq,
        });
        self.inner
            .ledger
            .write()
            .await
            .units
            .insert(name.clone(), UnitMetrics::new(priority));

        info!(unit = %name, priority, "unit registered");
        Ok(())
    }

    pub async fn add_observer(&self, observer: Arc<dyn CycleObserver>) {
        self.inner.observers.write().await.push(observer);
    }

    /// Start the cycle loop in a background task. Returns `false` if it was
    /// already running.
    pub async fn start(&self) -> bool {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("orchestrator already running");
            return false;
        }

        self.inner.shutdown.send_replace(false);
        let mut shutdown = self.inner.shutdown.subscribe();
        let interval = Duration::from_millis(self.inner.config.cycle_interval_ms);
        let this = self.clone();

        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "orchestrator started");
            loop {
                this.run_cycle().await;
                if *shutdown.borrow_and_update() {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.changed() => {
                        break;
                    }
                }
            }
            this.inner.running.store(false, Ordering::SeqCst);
            info!("orchestrator stopped");
        });

        *self.inner.task.lock().await = Some(handle);
        true
    }

    /// Ask the loop to exit and wait for the current cycle to finish.
    pub async fn stop(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            error!(error = %e, "orchestrator task ended abnormally");
            self.inner.running.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run exactly one cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut units = self.inner.units.lock().await;
        let mut state = self.inner.state.lock().await;

        let cycle = {
            let mut ledger = self.inner.ledger.write().await;
            ledger.cycle_count += 1;
            ledger.cycle_count
        };

        let market_stale = match self.inner.market.refresh() {
            Ok(snapshot) => {
                state.begin_cycle(cycle, snapshot);
                false
            }
            Err(e) => {
                warn!(cycle, error = %e, "market refresh failed, keeping previous snapshot");
                state.begin_cycle_with_stale_market(cycle, epoch_secs());
                true
            }
        };

        units.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));

        let mut runs = Vec::with_capacity(units.len());
        for reg in units.iter_mut() {
            let name = reg.unit.name().to_string();
            let timer = Instant::now();
            let result = self.execute_unit(&mut reg.unit, &mut state).await;
            let duration_ms = timer.elapsed().as_millis() as u64;
            runs.push(self.record_run(cycle, &name, reg.priority, duration_ms, result).await);
        }

        let insights = derive_insights(&state);

        {
            let mut ledger = self.inner.ledger.write().await;
            for reg in units.iter_mut() {
                let Some(m) = ledger.units.get_mut(reg.unit.name()) else {
                    continue;
                };
                let tuned = tune_priority(
                    reg.priority,
                    m.success_rate,
                    m.runs,
                    self.inner.config.promote_above,
                    self.inner.config.demote_below,
                );
                if tuned != reg.priority {
                    debug!(
                        unit = %reg.unit.name(),
                        from = reg.priority,
                        to = tuned,
                        success_rate = m.success_rate,
                        "priority retuned"
                    );
                    reg.priority = tuned;
                    m.priority = tuned;
                }
            }
            ledger.market_stale = market_stale;
            ledger.last_cycle_duration_ms = started.elapsed().as_millis() as u64;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let snapshot = self.snapshot(&state).await;
        drop(state);
        drop(units);

        let observers = self.inner.observers.read().await;
        for observer in observers.iter() {
            for insight in &insights {
                observer.on_insight(insight);
            }
            observer.on_cycle_complete(&snapshot);
        }

        let failed = runs.iter().filter(|r| !r.success).count();
        info!(
            cycle,
            duration_ms,
            units = runs.len(),
            failed,
            insights = insights.len(),
            market_stale,
            "cycle finished"
        );

        CycleReport {
            cycle,
            duration_ms,
            market_stale,
            runs,
            insights,
        }
    }

    /// Metrics snapshot. Waits for an in-flight cycle to finish.
    pub async fn metrics(&self) -> OrchestratorMetrics {
        let state = self.inner.state.lock().await;
        self.snapshot(&state).await
    }

    /// Run `f` against the state between cycles. Waits for an in-flight
    /// cycle to finish.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut CycleState) -> R) -> R {
        let mut state = self.inner.state.lock().await;
        f(&mut state)
    }

    async fn execute_unit(
        &self,
        unit: &mut Box<dyn SchedulingUnit>,
        state: &mut CycleState,
    ) -> Result<String, UnitError> {
        let timeout_ms = self.inner.config.unit_timeout_ms;
        let guarded = AssertUnwindSafe(unit.execute(state)).catch_unwind();
        let outcome = if timeout_ms == 0 {
            guarded.await
        } else {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), guarded).await {
                Ok(result) => result,
                Err(_) => Ok(Err(UnitError::Timeout(timeout_ms))),
            }
        };
        match outcome {
            Ok(result) => result.map(|o| o.summary),
            Err(payload) => Err(UnitError::Failed(format!(
                "panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    async fn record_run(
        &self,
        cycle: u64,
        name: &str,
        priority: u8,
        duration_ms: u64,
        result: Result<String, UnitError>,
    ) -> UnitRun {
        let mut ledger = self.inner.ledger.write().await;
        let strategy = self.inner.strategy;
        let penalty = self.inner.config.failure_penalty;

        match result {
            Ok(summary) => {
                debug!(unit = %name, cycle, duration_ms, summary = %summary, "unit succeeded");
                if let Some(m) = ledger.units.get_mut(name) {
                    m.record_success(strategy, duration_ms, summary.clone());
                }
                UnitRun {
                    unit: name.to_string(),
                    priority,
                    duration_ms,
                    success: true,
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                let timestamp = epoch_secs();
                error!(unit = %name, cycle, timestamp, duration_ms, error = %message, "unit failed");
                if let Some(m) = ledger.units.get_mut(name) {
                    m.record_failure(strategy, penalty, duration_ms, message.clone());
                }
                ledger.errors.push(ErrorEvent {
                    timestamp,
                    cycle,
                    unit: name.to_string(),
                    message: message.clone(),
                });
                UnitRun {
                    unit: name.to_string(),
                    priority,
                    duration_ms,
                    success: false,
                    summary: None,
                    error: Some(message),
                }
            }
        }
    }

    async fn snapshot(&self, state: &CycleState) -> OrchestratorMetrics {
        let ledger = self.inner.ledger.read().await;
        OrchestratorMetrics {
            cycle_count: ledger.cycle_count,
            running: self.is_running(),
            units: ledger.units.clone(),
            jobs: state.job_count(),
            open_jobs: state.open_jobs().len(),
            providers: state.provider_count(),
            pairs: state.pair_count(),
            market: *state.market(),
            market_stale: ledger.market_stale,
            last_cycle_duration_ms: ledger.last_cycle_duration_ms,
            recent_errors: ledger.errors.to_vec(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
