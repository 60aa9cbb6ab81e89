//! # Header Batch Submitter
//!
//! Moves one window of source headers into the mirror:
//!
//! 1. Fetch hash then header per height, ascending, sequentially
//! 2. Provision every record in the window (concurrent, joined)
//! 3. Settle, then poll until the new records are visible
//! 4. Submit the concatenated payload in one call
//!
//! Any fetch failure aborts before a write is attempted. Submission errors
//! are returned as-is; nothing here retries.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::algorithms::{compute_sync_window, validate_batch_linkage, verify_fetched_header};
use crate::config::SyncConfig;
use crate::domain::{
    invariant_batch_bound, invariant_payload_contiguous, BlockHash, BlockHeader, HeaderBatch,
    RecordRef, RelayError, SyncWindow,
};
use crate::ports::outbound::{MirrorLedger, SourceChainClient};

/// Batch submitter over a source chain and a mirror ledger.
pub struct HeaderBatchSubmitter<S: ?Sized, M: ?Sized> {
    source: Arc<S>,
    mirror: Arc<M>,
    config: SyncConfig,
}

impl<S, M> HeaderBatchSubmitter<S, M>
where
    S: SourceChainClient + ?Sized,
    M: MirrorLedger + ?Sized,
{
    /// Create a submitter. Only the timing fields of `config` are used here;
    /// the batch bound is passed per call.
    pub fn new(source: Arc<S>, mirror: Arc<M>, config: SyncConfig) -> Self {
        Self {
            source,
            mirror,
            config,
        }
    }

    /// Submit headers for `(common_height, min(source_tip, common_height + max_batch)]`.
    ///
    /// Returns the number of headers submitted; 0 when the window is empty,
    /// in which case nothing is fetched or written.
    pub async fn submit(
        &self,
        common_height: u64,
        source_tip: u64,
        max_batch: u64,
    ) -> Result<u64, RelayError> {
        let window = compute_sync_window(common_height, source_tip, max_batch);
        if window.is_empty() {
            debug!("[relay] empty window at {}, nothing to submit", common_height);
            return Ok(0);
        }
        debug_assert!(invariant_batch_bound(&window, max_batch));

        let batch = self.fetch_batch(&window).await?;
        let records = self.provision_records(&window).await?;

        let payload = batch.payload();
        invariant_payload_contiguous(&window, payload.len())?;

        info!(
            "[relay] submitting {} headers for heights {}..={}",
            batch.len(),
            window.start_height(),
            window.target_height
        );
        self.mirror
            .submit_header_batch(window.start_height(), &payload, &records)
            .await?;

        Ok(window.len())
    }

    async fn fetch_batch(&self, window: &SyncWindow) -> Result<HeaderBatch, RelayError> {
        let mut headers: Vec<BlockHeader> = Vec::with_capacity(window.len() as usize);
        for height in window.heights() {
            let hash = self.source.hash_at(height).await?;
            let header = self.source.header_at(&hash).await?;
            verify_fetched_header(height, &hash, &header)?;
            debug!("[relay] fetched header {} at {}", hash, height);
            headers.push(header);
        }

        let batch = HeaderBatch::new(window.start_height(), headers);
        validate_batch_linkage(&batch)?;
        Ok(batch)
    }

    /// Ensure a record exists for every height in the window.
    ///
    /// Existing records are left alone; missing ones are created with the
    /// zero hash. Creation calls run concurrently and all must finish
    /// before this returns.
    async fn provision_records(&self, window: &SyncWindow) -> Result<Vec<RecordRef>, RelayError> {
        let existing = try_join_all(
            window
                .heights()
                .map(|height| self.mirror.hash_record_at(height)),
        )
        .await?;

        let missing: Vec<u64> = window
            .heights()
            .zip(existing.iter())
            .filter(|(_, record)| record.is_none())
            .map(|(height, _)| height)
            .collect();

        if !missing.is_empty() {
            try_join_all(
                missing
                    .iter()
                    .map(|&height| self.mirror.provision_height_record(height, BlockHash::ZERO)),
            )
            .await?;
            debug!("[relay] provisioned {} records", missing.len());

            tokio::time::sleep(self.config.settle_delay()).await;
            self.await_visibility(&missing).await?;
        }

        Ok(window.heights().map(RecordRef::new).collect())
    }

    async fn await_visibility(&self, heights: &[u64]) -> Result<(), RelayError> {
        for &height in heights {
            let mut attempts = 0;
            loop {
                if self.mirror.hash_record_at(height).await?.is_some() {
                    break;
                }
                attempts += 1;
                if attempts >= self.config.visibility_poll_attempts {
                    return Err(RelayError::MirrorUnavailable(format!(
                        "record at height {} not visible after {} polls",
                        height, attempts
                    )));
                }
                tokio::time::sleep(self.config.visibility_poll_interval()).await;
            }
        }
        Ok(())
    }
}
