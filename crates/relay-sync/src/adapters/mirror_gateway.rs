//! Ledger Gateway Adapter
//!
//! Implements `MirrorStateReader` and `MirrorWriter` by calling a ledger
//! gateway over JSON-RPC. The gateway owns keys, fee payment and record
//! address derivation; the relay only sees the four mirror operations.
//!
//! Hashes travel as hex in internal byte order, the order the mirror stores.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::json_rpc::{JsonRpcTransport, RpcCallError};
use crate::domain::{BlockHash, ChainTip, HeightHashRecord, RecordRef, RelayError};
use crate::ports::outbound::{MirrorStateReader, MirrorWriter};

/// Gateway error code: the mirror has no genesis state.
pub const GATEWAY_MIRROR_UNINITIALIZED: i64 = -32001;

#[derive(Debug, Deserialize)]
struct TipResponse {
    height: u64,
    hash: String,
    time: u32,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    height: u64,
    hash: String,
}

#[derive(Debug, Serialize)]
struct SubmitParams<'a> {
    start_height: u64,
    headers: String,
    records: &'a [RecordRef],
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    transaction: Option<String>,
}

/// JSON-RPC ledger gateway client.
pub struct JsonRpcMirrorClient {
    transport: JsonRpcTransport,
}

impl JsonRpcMirrorClient {
    /// Create a client for the gateway at `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let transport = JsonRpcTransport::new(url, None, timeout)
            .map_err(|e| RelayError::InvalidConfig(format!("mirror gateway client: {}", e)))?;
        Ok(Self { transport })
    }

    /// Gateway URL.
    pub fn url(&self) -> &str {
        self.transport.url()
    }
}

fn map_read_error(err: RpcCallError) -> RelayError {
    match err {
        RpcCallError::Rpc(rpc) if rpc.code == GATEWAY_MIRROR_UNINITIALIZED => {
            RelayError::MirrorUninitialized
        }
        RpcCallError::Rpc(rpc) => {
            RelayError::MirrorUnavailable(format!("gateway error {}: {}", rpc.code, rpc.message))
        }
        RpcCallError::Decode(msg) => RelayError::Malformed(msg),
        other => RelayError::MirrorUnavailable(other.to_string()),
    }
}

fn map_submit_error(err: RpcCallError) -> RelayError {
    match err {
        RpcCallError::Rpc(rpc) if rpc.code == GATEWAY_MIRROR_UNINITIALIZED => {
            RelayError::MirrorUninitialized
        }
        // The program's reason, untouched.
        RpcCallError::Rpc(rpc) => RelayError::SubmissionRejected(rpc.message),
        other => map_read_error(other),
    }
}

#[async_trait]
impl MirrorStateReader for JsonRpcMirrorClient {
    async fn tip(&self) -> Result<ChainTip, RelayError> {
        let tip: TipResponse = self
            .transport
            .call("mirror_readTip", json!([]))
            .await
            .map_err(map_read_error)?;
        Ok(ChainTip::new(
            tip.height,
            BlockHash::from_internal_hex(&tip.hash)?,
            tip.time,
        ))
    }

    async fn hash_record_at(&self, height: u64) -> Result<Option<HeightHashRecord>, RelayError> {
        let record: Option<RecordResponse> = self
            .transport
            .call_optional("mirror_readHeightRecord", json!([height]))
            .await
            .map_err(map_read_error)?;

        record
            .map(|r| Ok(HeightHashRecord::new(r.height, BlockHash::from_internal_hex(&r.hash)?)))
            .transpose()
    }
}

#[async_trait]
impl MirrorWriter for JsonRpcMirrorClient {
    async fn provision_height_record(
        &self,
        height: u64,
        initial_hash: BlockHash,
    ) -> Result<RecordRef, RelayError> {
        let record: RecordResponse = self
            .transport
            .call(
                "mirror_provisionHeightRecord",
                json!([height, initial_hash.to_internal_hex()]),
            )
            .await
            .map_err(map_read_error)?;
        debug!("[relay] gateway provisioned record at {}", record.height);
        Ok(RecordRef::new(record.height))
    }

    async fn submit_header_batch(
        &self,
        start_height: u64,
        headers: &[u8],
        records: &[RecordRef],
    ) -> Result<(), RelayError> {
        let params = SubmitParams {
            start_height,
            headers: hex::encode(headers),
            records,
        };
        let response: SubmitResponse = self
            .transport
            .call("mirror_submitHeaderBatch", [params])
            .await
            .map_err(map_submit_error)?;
        info!(
            "[relay] gateway accepted batch at {} (tx {})",
            start_height,
            response.transaction.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}
