//! # Runtime Configuration
//!
//! Command-line flags, each with an environment fallback.
//!
//! ## Requirements
//!
//! - `BITCOIN_RPC_AUTH` must be `user:password`
//! - Batch size and tick interval must be non-zero
//! - `MIRROR_RPC_URL` is required unless `--dry-run` is set

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use relay_sync::{RpcCredentials, SyncConfig};

/// Header relay runtime configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "relay-runtime")]
#[command(about = "Relay Bitcoin block headers into a ledger-hosted header mirror")]
pub struct RuntimeConfig {
    /// Bitcoin node JSON-RPC endpoint.
    #[arg(long, env = "BITCOIN_RPC_URL", default_value = "http://127.0.0.1:18443")]
    pub bitcoin_rpc_url: String,

    /// Bitcoin node credentials as `user:password`.
    #[arg(long, env = "BITCOIN_RPC_AUTH", default_value = "test:1234", hide_env_values = true)]
    pub bitcoin_rpc_auth: String,

    /// Ledger gateway JSON-RPC endpoint.
    #[arg(long, env = "MIRROR_RPC_URL")]
    pub mirror_rpc_url: Option<String>,

    /// Maximum headers per submission.
    #[arg(long, env = "MAX_BLOCKS_PER_BATCH", default_value_t = relay_sync::DEFAULT_MAX_BATCH)]
    pub max_blocks_per_batch: u64,

    /// Daemon tick interval in seconds.
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value_t = 60)]
    pub sync_interval_secs: u64,

    /// Deepest reorg healed without operator intervention.
    #[arg(long, env = "MAX_REORG_DEPTH", default_value_t = relay_sync::DEFAULT_MAX_LOOKBACK)]
    pub max_reorg_depth: u64,

    /// Pause after provisioning records, in milliseconds.
    #[arg(long, env = "SETTLE_DELAY_MS", default_value_t = 5_000)]
    pub settle_delay_ms: u64,

    /// Per-request timeout for both RPC endpoints, in seconds.
    #[arg(long, env = "RPC_TIMEOUT_SECS", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Keep running and sync on every tick.
    #[arg(long)]
    pub daemon: bool,

    /// Submit into an in-memory mirror seeded near the source tip.
    #[arg(long)]
    pub dry_run: bool,
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Credentials are not `user:password`.
    #[error("BITCOIN_RPC_AUTH must be formatted as user:password")]
    InvalidCredentials,

    /// Batch size of zero.
    #[error("MAX_BLOCKS_PER_BATCH must be greater than zero")]
    ZeroBatchSize,

    /// Tick interval of zero.
    #[error("SYNC_INTERVAL_SECS must be greater than zero")]
    ZeroInterval,

    /// Timeout of zero.
    #[error("RPC_TIMEOUT_SECS must be greater than zero")]
    ZeroTimeout,

    /// No ledger gateway to talk to.
    #[error("MIRROR_RPC_URL is required unless --dry-run is set")]
    MissingMirrorUrl,
}

impl RuntimeConfig {
    /// Check the configuration before any connection is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        if self.max_blocks_per_batch == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.rpc_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if !self.dry_run && self.mirror_rpc_url.is_none() {
            return Err(ConfigError::MissingMirrorUrl);
        }
        Ok(())
    }

    /// Parsed Bitcoin node credentials.
    pub fn credentials(&self) -> Result<RpcCredentials, ConfigError> {
        RpcCredentials::parse(&self.bitcoin_rpc_auth).ok_or(ConfigError::InvalidCredentials)
    }

    /// RPC timeout.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Core sync settings.
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_batch: self.max_blocks_per_batch,
            max_lookback: self.max_reorg_depth,
            tick_interval_secs: self.sync_interval_secs,
            settle_delay_ms: self.settle_delay_ms,
            ..SyncConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RuntimeConfig {
        let mut argv = vec!["relay-runtime"];
        argv.extend_from_slice(args);
        RuntimeConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--mirror-rpc-url",
            "http://gateway:9000",
            "--max-blocks-per-batch",
            "25",
            "--max-reorg-depth",
            "100",
            "--daemon",
        ]);
        assert!(config.daemon);
        assert!(config.validate().is_ok());

        let sync = config.to_sync_config();
        assert_eq!(sync.max_batch, 25);
        assert_eq!(sync.max_lookback, 100);
    }

    #[test]
    fn test_rejects_bad_credentials() {
        let config = parse(&["--bitcoin-rpc-auth", "nocolon", "--dry-run"]);
        assert_eq!(config.validate(), Err(ConfigError::InvalidCredentials));
    }

    #[test]
    fn test_rejects_zero_batch() {
        let config = parse(&["--max-blocks-per-batch", "0", "--dry-run"]);
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn test_requires_mirror_url_outside_dry_run() {
        let mut config = parse(&["--dry-run"]);
        assert!(config.validate().is_ok());

        config.dry_run = false;
        config.mirror_rpc_url = None;
        assert_eq!(config.validate(), Err(ConfigError::MissingMirrorUrl));
    }

    #[test]
    fn test_timeout_conversion() {
        let config = parse(&["--rpc-timeout-secs", "7", "--dry-run"]);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(7));
    }
}
