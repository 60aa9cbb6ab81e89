//! # Process Lifecycle
//!
//! Turns Ctrl-C and, on Unix, SIGTERM into a shutdown watch signal.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Wait for an interrupt or termination signal.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Flip `shutdown_tx` to `true` on the first signal.
pub fn spawn_signal_listener(shutdown_tx: watch::Sender<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("[relay] failed to listen for shutdown signals: {}", e);
            return;
        }
        info!("[relay] shutdown signal received, finishing current run");
        if let Err(e) = shutdown_tx.send(true) {
            error!("[relay] failed to send shutdown signal: {}", e);
        }
    })
}
