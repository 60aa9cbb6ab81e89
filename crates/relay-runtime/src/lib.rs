//! # Relay Runtime Library
//!
//! Wiring for the header relay executable, exposed for testing. The main
//! entry point is the `main.rs` binary.
//!
//! ## Startup Sequence
//!
//! 1. Parse configuration (flags, then environment)
//! 2. Initialize logging
//! 3. Build adapters (`container/`)
//! 4. Run once, or run as a daemon until a shutdown signal

#![warn(missing_docs)]

pub mod container;
pub mod lifecycle;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use relay_sync::{
    DaemonSummary, HeaderRelayApi, HeaderRelayService, MirrorLedger, RelayError,
    SourceChainClient, SyncConfig, SyncReport, SyncScheduler,
};

pub use container::{ConfigError, RelayContainer, RuntimeConfig};

/// How a runtime invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Single-shot run. `None` if another run was already active.
    Single(Option<SyncReport>),
    /// Daemon stopped after a shutdown signal.
    Daemon(DaemonSummary),
}

/// The relay process: a scheduler plus its shutdown channel.
pub struct RelayRuntime {
    /// Run scheduler.
    scheduler: Arc<SyncScheduler<dyn HeaderRelayApi>>,
    /// Daemon mode?
    daemon: bool,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayRuntime {
    /// Wire a runtime over already-built adapters.
    pub fn with_adapters(
        sync_config: SyncConfig,
        source: Arc<dyn SourceChainClient>,
        mirror: Arc<dyn MirrorLedger>,
        daemon: bool,
    ) -> Self {
        let tick_interval = sync_config.tick_interval();
        let relay: Arc<dyn HeaderRelayApi> =
            Arc::new(HeaderRelayService::new(sync_config, source, mirror));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            scheduler: Arc::new(SyncScheduler::new(relay, tick_interval)),
            daemon,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Build a runtime from configuration, connecting the real adapters.
    pub async fn from_config(config: &RuntimeConfig) -> anyhow::Result<Self> {
        let sync_config = config.to_sync_config();
        sync_config.validate()?;
        let container = RelayContainer::from_config(config).await?;
        Ok(Self::with_adapters(
            sync_config,
            container.source,
            container.mirror,
            config.daemon,
        ))
    }

    /// Sender that stops the daemon when set to `true`.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    /// Route SIGINT/SIGTERM into the shutdown channel, daemon mode only.
    ///
    /// Single-shot runs keep the default signal behaviour so Ctrl-C still
    /// kills a run stuck on RPC timeouts.
    pub fn listen_for_shutdown(&self) -> Option<JoinHandle<()>> {
        self.daemon
            .then(|| lifecycle::spawn_signal_listener(self.shutdown_handle()))
    }

    /// Run in the configured mode.
    ///
    /// Single-shot errors are returned; daemon mode only returns once
    /// shut down.
    pub async fn run(&self) -> Result<RunOutcome, RelayError> {
        if self.daemon {
            let summary = self.scheduler.run_daemon(self.shutdown_rx.clone()).await;
            return Ok(RunOutcome::Daemon(summary));
        }

        info!("[relay] single-shot run");
        let report = self.scheduler.run_once().await?;
        Ok(RunOutcome::Single(report))
    }
}
