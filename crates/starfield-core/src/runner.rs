//! Fixed-interval tick loop and the persistence sync callback.
//!
//! [`run_simulation`] drives the shared [`Simulation`] once per tick
//! interval until `max_ticks` is reached or a stop is requested through a
//! [`StopSignal`]. The write lock is held only for the step itself. After
//! each tick a [`TickCallback`] sees the summary and a read-only view of the
//! simulation; [`PersistenceSync`] is the production callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{OfflinePolicy, PersistenceConfig, RunnerConfig};
use crate::persistence::Persistence;
use crate::simulation::{SharedSimulation, Simulation, TickSummary};

/// Errors that prevent the tick loop from running.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Zero interval without a tick limit would spin forever holding the lock.
    #[error("tick_interval_ms is 0 and max_ticks is 0; the loop would never yield")]
    UnboundedBusyLoop,
}

/// Why the tick loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The configured `max_ticks` was reached.
    MaxTicksReached,
    /// [`StopSignal::request_stop`] was called.
    StopRequested,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the loop ended.
    pub end_reason: RunEndReason,
    /// Ticks executed by this run.
    pub total_ticks: u64,
    /// Summary of the last tick, if any ran.
    pub final_summary: Option<TickSummary>,
}

/// Stop request shared between the tick loop and whoever ends it.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Create a signal with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop. Wakes every task waiting in [`Self::stopped`].
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            let mut notified = std::pin::pin!(notified);
            // Register before checking the flag so a concurrent stop is not missed.
            notified.as_mut().enable();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }
}

/// Hook run after every tick.
pub trait TickCallback: Send {
    /// Called with the summary of the tick that just ran.
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) {}
}

/// Run the tick loop until `max_ticks` or a stop request.
///
/// Each iteration checks the stop signal, sleeps the tick interval, then
/// steps the simulation under the write lock and hands the summary to
/// `callback` under a read lock.
pub async fn run_simulation(
    simulation: &SharedSimulation,
    config: &RunnerConfig,
    stop: &StopSignal,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, RunnerError> {
    if config.tick_interval_ms == 0 && config.max_ticks == 0 {
        return Err(RunnerError::UnboundedBusyLoop);
    }

    let interval = Duration::from_millis(config.tick_interval_ms);
    let mut total_ticks: u64 = 0;
    let mut final_summary: Option<TickSummary> = None;

    info!(
        tick_interval_ms = config.tick_interval_ms,
        max_ticks = config.max_ticks,
        "Simulation starting"
    );

    loop {
        if stop.is_stop_requested() {
            info!("Stop requested");
            return Ok(RunResult {
                end_reason: RunEndReason::StopRequested,
                total_ticks,
                final_summary,
            });
        }

        if !interval.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = stop.stopped() => continue,
            }
        }

        let summary = simulation.write().await.step();
        total_ticks = total_ticks.saturating_add(1);

        debug!(
            tick = summary.tick,
            active = summary.report.active,
            discoveries = summary.report.discoveries,
            arrivals = summary.report.arrivals,
            departed = summary.report.departed.len(),
            "Tick complete"
        );

        {
            let guard = simulation.read().await;
            callback.on_tick(&summary, &guard);
        }

        let done = config.max_ticks > 0 && total_ticks >= config.max_ticks;
        final_summary = Some(summary);
        if done {
            info!(max_ticks = config.max_ticks, "Tick limit reached");
            return Ok(RunResult {
                end_reason: RunEndReason::MaxTicksReached,
                total_ticks,
                final_summary,
            });
        }
    }
}

/// Log how a run ended.
pub fn log_simulation_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        active_ships = result.final_summary.as_ref().map(|s| s.report.active),
        "Simulation ended"
    );
    if result.final_summary.is_none() {
        warn!("Simulation ended with no ticks executed");
    }
}

/// Keeps the store in step with the simulation.
///
/// Departed ships are deleted on the tick they leave. Every
/// `sync_every_ticks` ticks the stored population is replaced by the live
/// one and the field is written, which also clears ships whose delete was
/// skipped while offline. While offline under [`OfflinePolicy::Reprobe`],
/// the store is re-probed every `reprobe_every_ticks` ticks.
///
/// Writes run in the background but one after another, in tick order, so a
/// snapshot never lands after a delete issued on a later tick.
pub struct PersistenceSync {
    persistence: Persistence,
    sync_every_ticks: u64,
    reprobe_every_ticks: u64,
    tail: Option<JoinHandle<()>>,
}

impl PersistenceSync {
    /// Create a sync callback from runner and persistence settings.
    pub fn new(persistence: Persistence, runner: &RunnerConfig, config: &PersistenceConfig) -> Self {
        Self {
            persistence,
            sync_every_ticks: runner.sync_every_ticks,
            reprobe_every_ticks: config.reprobe_every_ticks,
            tail: None,
        }
    }

    /// Wait for every write queued so far.
    pub async fn settle(&mut self) {
        if let Some(tail) = self.tail.take() {
            join_write(tail).await;
        }
    }

    /// Run `write` after everything queued before it.
    fn enqueue<F>(&mut self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.tail.take();
        self.tail = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                join_write(previous).await;
            }
            write.await;
        }));
    }
}

impl TickCallback for PersistenceSync {
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation) {
        if !self.persistence.is_available() {
            let due = is_due(summary.tick, self.reprobe_every_ticks);
            if due && self.persistence.policy() == OfflinePolicy::Reprobe {
                let gate = self.persistence.clone();
                self.enqueue(async move {
                    gate.reprobe().await;
                });
            }
            return;
        }

        if !summary.report.departed.is_empty() {
            let gate = self.persistence.clone();
            let departed = summary.report.departed.clone();
            self.enqueue(async move {
                for id in departed {
                    gate.delete_ship(id).await;
                }
            });
        }

        if is_due(summary.tick, self.sync_every_ticks) {
            debug!(tick = summary.tick, ships = simulation.registry().len(), "Batch sync");
            let gate = self.persistence.clone();
            let records = simulation.registry().records();
            let points = simulation.field().points().to_vec();
            self.enqueue(async move {
                gate.flush(records, points).await;
            });
        }
    }
}

/// Wait for one queued write, logging a panicked or cancelled task.
async fn join_write(handle: JoinHandle<()>) {
    if let Err(err) = handle.await {
        warn!(error = %err, "Persistence task did not complete");
    }
}

/// Whether `tick` is a multiple of a non-zero `every`.
const fn is_due(tick: u64, every: u64) -> bool {
    matches!(tick.checked_rem(every), Some(0))
}
