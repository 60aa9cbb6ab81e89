//! # Sync Scheduler
//!
//! Drives sync runs, one at a time.
//!
//! ## State Machine
//!
//! ```text
//!   Idle ──run_once──→ Running ──(done / failed)──→ Idle
//!                         │
//!              run_once ──┘ (dropped, returns None)
//! ```
//!
//! ## Modes
//!
//! - **Single-shot** (`run_once`): one run, errors returned to the caller.
//! - **Daemon** (`run_daemon`): run now, then on every tick. Errors are
//!   logged and the loop keeps going. A shutdown signal stops the timer;
//!   a run already in flight is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::{RelayError, SyncReport};
use crate::ports::inbound::HeaderRelayApi;

/// Scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunState {
    /// No run in progress.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
}

/// Restores `Idle` when the run ends, however it ends.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
}

impl<'a> RunGuard<'a> {
    fn acquire(state: &'a Mutex<RunState>) -> Option<Self> {
        let mut current = state.lock();
        if *current == RunState::Running {
            return None;
        }
        *current = RunState::Running;
        Some(Self { state })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = RunState::Idle;
    }
}

/// Outcome counts for a daemon session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DaemonSummary {
    /// Ticks that fired.
    pub ticks: u64,
    /// Runs that completed.
    pub succeeded: u64,
    /// Runs that failed and were deferred to the next tick.
    pub failed: u64,
    /// Ticks dropped because a run was already active.
    pub skipped: u64,
}

/// Serializes sync runs over a relay.
pub struct SyncScheduler<R: ?Sized> {
    relay: Arc<R>,
    state: Mutex<RunState>,
    tick_interval: Duration,
}

impl<R: HeaderRelayApi + ?Sized> SyncScheduler<R> {
    /// Create a scheduler ticking every `tick_interval` in daemon mode.
    pub fn new(relay: Arc<R>, tick_interval: Duration) -> Self {
        Self {
            relay,
            state: Mutex::new(RunState::Idle),
            tick_interval,
        }
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Perform one run.
    ///
    /// Returns `Ok(None)` without doing anything if a run is already active.
    pub async fn run_once(&self) -> Result<Option<SyncReport>, RelayError> {
        let _guard = match RunGuard::acquire(&self.state) {
            Some(guard) => guard,
            None => {
                debug!("[relay] run already in progress, dropping request");
                return Ok(None);
            }
        };

        self.relay.sync_once().await.map(Some)
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run_daemon(&self, mut shutdown: watch::Receiver<bool>) -> DaemonSummary {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = DaemonSummary::default();

        info!(
            "[relay] daemon started, tick every {}s",
            self.tick_interval.as_secs_f64()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            summary.ticks += 1;
            // Not raced against shutdown: an in-flight run always finishes.
            match self.run_once().await {
                Ok(Some(_)) => summary.succeeded += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) if e.is_recoverable() => {
                    summary.failed += 1;
                    warn!(kind = e.kind(), "[relay] sync run failed, retrying next tick: {}", e);
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(kind = e.kind(), "[relay] sync run failed: {}", e);
                }
            }
        }

        info!(
            ticks = summary.ticks,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "[relay] daemon stopped"
        );
        summary
    }
}
