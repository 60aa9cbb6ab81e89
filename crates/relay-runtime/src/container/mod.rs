//! # Relay Container
//!
//! Builds the concrete adapters the sync core runs against.
//!
//! - Source: bitcoind JSON-RPC
//! - Mirror: ledger gateway JSON-RPC, or an in-memory mirror for dry runs

pub mod config;

pub use config::{ConfigError, RuntimeConfig};

use std::sync::Arc;

use tracing::info;

use relay_sync::{
    BitcoinRpcClient, InMemoryMirror, JsonRpcMirrorClient, MirrorLedger, RelayError,
    SourceChainClient,
};

/// Adapters wired for one relay process.
pub struct RelayContainer {
    /// Bitcoin node.
    pub source: Arc<dyn SourceChainClient>,
    /// Header mirror.
    pub mirror: Arc<dyn MirrorLedger>,
}

impl RelayContainer {
    /// Build adapters from a validated configuration.
    ///
    /// In dry-run mode this contacts the Bitcoin node to seed the in-memory
    /// mirror.
    pub async fn from_config(config: &RuntimeConfig) -> Result<Self, RelayError> {
        let credentials = config
            .credentials()
            .map_err(|e| RelayError::InvalidConfig(e.to_string()))?;
        let source: Arc<dyn SourceChainClient> = Arc::new(BitcoinRpcClient::new(
            config.bitcoin_rpc_url.clone(),
            credentials,
            config.rpc_timeout(),
        )?);
        info!("[relay] source chain: {}", config.bitcoin_rpc_url);

        let mirror: Arc<dyn MirrorLedger> = if config.dry_run {
            let mirror = seed_dry_run_mirror(source.as_ref(), config.max_blocks_per_batch).await?;
            Arc::new(mirror)
        } else {
            let url = config
                .mirror_rpc_url
                .clone()
                .ok_or_else(|| RelayError::InvalidConfig(ConfigError::MissingMirrorUrl.to_string()))?;
            info!("[relay] mirror gateway: {}", url);
            Arc::new(JsonRpcMirrorClient::new(url, config.rpc_timeout())?)
        };

        Ok(Self { source, mirror })
    }
}

/// In-memory mirror whose genesis sits `lag` blocks below the source tip,
/// so a first run has a full batch to move.
pub async fn seed_dry_run_mirror(
    source: &dyn SourceChainClient,
    lag: u64,
) -> Result<InMemoryMirror, RelayError> {
    let tip = source.height().await?;
    let seed_height = tip.saturating_sub(lag);
    let hash = source.hash_at(seed_height).await?;
    let header = source.header_at(&hash).await?;

    let mirror = InMemoryMirror::new();
    mirror.initialize(seed_height, hash, header.time());
    info!(
        "[relay] dry run: in-memory mirror seeded at {} ({})",
        seed_height, hash
    );
    Ok(mirror)
}
