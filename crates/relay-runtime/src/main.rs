//! # Header Relay Runtime
//!
//! Entry point for the Bitcoin header relay.
//!
//! ## Exit Status
//!
//! - Single-shot: 0 on success, non-zero on any run error
//! - Daemon: 0 after a clean shutdown on SIGINT/SIGTERM

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use relay_runtime::{RelayRuntime, RunOutcome, RuntimeConfig};

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter: {}", level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::parse();
    init_tracing(&config.log_level)?;

    config.validate().context("invalid configuration")?;

    info!("===========================================");
    info!("  Header Relay v{}", relay_sync::VERSION);
    info!(
        "  Mode: {}{}",
        if config.daemon { "daemon" } else { "single-shot" },
        if config.dry_run { " (dry run)" } else { "" }
    );
    info!("===========================================");

    let runtime = RelayRuntime::from_config(&config)
        .await
        .context("failed to initialize relay")?;
    let _signals = runtime.listen_for_shutdown();

    match runtime.run().await.context("sync run failed")? {
        RunOutcome::Single(Some(report)) => {
            info!(
                "[relay] done: submitted {} headers, mirror tip {}",
                report.submitted,
                report.new_tip_height()
            );
        }
        RunOutcome::Single(None) => info!("[relay] another run was active, nothing done"),
        RunOutcome::Daemon(summary) => {
            info!(
                "[relay] shutdown complete after {} ticks ({} failed)",
                summary.ticks, summary.failed
            );
        }
    }

    Ok(())
}
