//! Bitcoin RPC Adapter
//!
//! Implements `SourceChainClient` against a bitcoind-compatible JSON-RPC
//! endpoint with HTTP Basic authentication.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::json_rpc::{JsonRpcTransport, RpcCallError, RpcCredentials};
use crate::domain::{BlockHash, BlockHeader, Lookup, RelayError};
use crate::ports::outbound::SourceChainClient;

/// bitcoind: invalid parameter, e.g. "Block height out of range".
pub const RPC_INVALID_PARAMETER: i64 = -8;
/// bitcoind: invalid address or key, e.g. "Block not found".
pub const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

/// HTTP-based Bitcoin node client.
pub struct BitcoinRpcClient {
    transport: JsonRpcTransport,
}

impl BitcoinRpcClient {
    /// Create a client for `url` authenticating with `credentials`.
    pub fn new(
        url: impl Into<String>,
        credentials: RpcCredentials,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let transport = JsonRpcTransport::new(url, Some(credentials), timeout)
            .map_err(|e| RelayError::InvalidConfig(format!("bitcoin rpc client: {}", e)))?;
        Ok(Self { transport })
    }

    /// Node URL.
    pub fn url(&self) -> &str {
        self.transport.url()
    }
}

/// Map a call failure; `missing` is what a "not found" RPC code refers to.
fn map_source_error(err: RpcCallError, missing: Option<Lookup>) -> RelayError {
    match err {
        RpcCallError::Rpc(rpc)
            if rpc.code == RPC_INVALID_PARAMETER || rpc.code == RPC_INVALID_ADDRESS_OR_KEY =>
        {
            match missing {
                Some(lookup) => RelayError::NotFound(lookup),
                None => RelayError::SourceUnavailable(format!(
                    "rpc error {}: {}",
                    rpc.code, rpc.message
                )),
            }
        }
        RpcCallError::Rpc(rpc) => {
            RelayError::SourceUnavailable(format!("rpc error {}: {}", rpc.code, rpc.message))
        }
        RpcCallError::Status(401) | RpcCallError::Status(403) => {
            RelayError::SourceUnavailable("authentication rejected by bitcoin node".to_string())
        }
        RpcCallError::Status(code) => RelayError::SourceUnavailable(format!("HTTP status {}", code)),
        RpcCallError::Transport(msg) => RelayError::SourceUnavailable(msg),
        RpcCallError::Decode(msg) => RelayError::Malformed(msg),
    }
}

#[async_trait]
impl SourceChainClient for BitcoinRpcClient {
    async fn height(&self) -> Result<u64, RelayError> {
        self.transport
            .call::<_, u64>("getblockcount", json!([]))
            .await
            .map_err(|e| map_source_error(e, None))
    }

    async fn hash_at(&self, height: u64) -> Result<BlockHash, RelayError> {
        let display_hex: String = self
            .transport
            .call("getblockhash", json!([height]))
            .await
            .map_err(|e| map_source_error(e, Some(Lookup::Height(height))))?;
        debug!("[relay] source hash at {}: {}", height, display_hex);
        BlockHash::from_display_hex(&display_hex)
    }

    async fn header_at(&self, hash: &BlockHash) -> Result<BlockHeader, RelayError> {
        let raw: String = self
            .transport
            .call("getblockheader", json!([hash.to_display_hex(), false]))
            .await
            .map_err(|e| map_source_error(e, Some(Lookup::Hash(*hash))))?;
        BlockHeader::from_hex(&raw)
    }
}
