//! In-Memory Mirror Adapter
//!
//! Implements `MirrorStateReader` and `MirrorWriter` by keeping the mirror's
//! tip and per-height records in memory. It enforces the program's
//! interface rules (record presence, hash linkage, monotonic height) but
//! not proof-of-work or difficulty.
//!
//! Used by tests and by the runtime's dry-run mode.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::domain::{
    BlockHash, BlockHeader, ChainTip, HeaderBatch, HeightHashRecord, RecordRef, RelayError,
};
use crate::ports::outbound::{MirrorStateReader, MirrorWriter};

/// A batch the mirror accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedBatch {
    /// First height of the batch.
    pub start_height: u64,
    /// Number of headers.
    pub header_count: usize,
    /// Payload size in bytes.
    pub payload_len: usize,
}

#[derive(Default)]
struct MirrorState {
    tip: Option<ChainTip>,
    records: BTreeMap<u64, BlockHash>,
    // Reads remaining before a freshly provisioned record becomes visible.
    hidden: HashMap<u64, usize>,
    visibility_lag: usize,
    reject_next: Option<String>,
    accepted: Vec<SubmittedBatch>,
}

/// In-memory mirror ledger.
#[derive(Default)]
pub struct InMemoryMirror {
    state: Mutex<MirrorState>,
    provision_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl InMemoryMirror {
    /// Uninitialized mirror: `tip()` fails until [`initialize`](Self::initialize).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the genesis state, like the program's one-time bootstrap.
    pub fn initialize(&self, height: u64, hash: BlockHash, time: u32) {
        let mut state = self.state.lock();
        state.tip = Some(ChainTip::new(height, hash, time));
        state.records.insert(height, hash);
    }

    /// Mirror that has already accepted `headers` starting at `start_height`.
    pub fn with_chain(start_height: u64, headers: &[BlockHeader]) -> Self {
        let mirror = Self::new();
        {
            let mut state = mirror.state.lock();
            for (offset, header) in headers.iter().enumerate() {
                state
                    .records
                    .insert(start_height + offset as u64, header.block_hash());
            }
            if let Some(last) = headers.last() {
                state.tip = Some(ChainTip::new(
                    start_height + headers.len() as u64 - 1,
                    last.block_hash(),
                    last.time(),
                ));
            }
        }
        mirror
    }

    /// Overwrite a stored record directly.
    pub fn set_record(&self, height: u64, hash: BlockHash) {
        self.state.lock().records.insert(height, hash);
    }

    /// Stored hash at `height`, ignoring visibility lag.
    pub fn stored_hash(&self, height: u64) -> Option<BlockHash> {
        self.state.lock().records.get(&height).copied()
    }

    /// Current tip, if initialized.
    pub fn current_tip(&self) -> Option<ChainTip> {
        self.state.lock().tip
    }

    /// Newly provisioned records stay invisible to the next `reads` lookups.
    pub fn set_visibility_lag(&self, reads: usize) {
        self.state.lock().visibility_lag = reads;
    }

    /// Reject the next submission with `reason`.
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.state.lock().reject_next = Some(reason.into());
    }

    /// Batches accepted so far, in order.
    pub fn accepted_batches(&self) -> Vec<SubmittedBatch> {
        self.state.lock().accepted.clone()
    }

    /// Provisioning calls received.
    pub fn provision_calls(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    /// Submission calls received, accepted or not.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// All write calls received.
    pub fn write_calls(&self) -> usize {
        self.provision_calls() + self.submit_calls()
    }
}

fn reject(reason: &str) -> RelayError {
    RelayError::SubmissionRejected(reason.to_string())
}

#[async_trait]
impl MirrorStateReader for InMemoryMirror {
    async fn tip(&self) -> Result<ChainTip, RelayError> {
        self.state.lock().tip.ok_or(RelayError::MirrorUninitialized)
    }

    async fn hash_record_at(&self, height: u64) -> Result<Option<HeightHashRecord>, RelayError> {
        let mut state = self.state.lock();
        if let Some(remaining) = state.hidden.get_mut(&height) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
            state.hidden.remove(&height);
        }
        Ok(state
            .records
            .get(&height)
            .map(|hash| HeightHashRecord::new(height, *hash)))
    }
}

#[async_trait]
impl MirrorWriter for InMemoryMirror {
    async fn provision_height_record(
        &self,
        height: u64,
        initial_hash: BlockHash,
    ) -> Result<RecordRef, RelayError> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if !state.records.contains_key(&height) {
            state.records.insert(height, initial_hash);
            let lag = state.visibility_lag;
            if lag > 0 {
                state.hidden.insert(height, lag);
            }
            debug!("[relay] mirror provisioned record at height {}", height);
        }
        Ok(RecordRef::new(height))
    }

    async fn submit_header_batch(
        &self,
        start_height: u64,
        headers: &[u8],
        records: &[RecordRef],
    ) -> Result<(), RelayError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();

        if let Some(reason) = state.reject_next.take() {
            return Err(RelayError::SubmissionRejected(reason));
        }

        let tip = state.tip.ok_or(RelayError::MirrorUninitialized)?;
        let batch = HeaderBatch::from_payload(start_height, headers)
            .map_err(|_| reject("Invalid block header length"))?;
        let end_height = batch.end_height().ok_or_else(|| reject("No headers provided"))?;

        if records.len() != batch.len()
            || records
                .iter()
                .zip(start_height..=end_height)
                .any(|(r, h)| r.height != h || !state.records.contains_key(&h))
        {
            return Err(reject("Invalid account number"));
        }

        let parent = start_height
            .checked_sub(1)
            .and_then(|h| state.records.get(&h))
            .filter(|hash| !hash.is_zero())
            .copied()
            .ok_or_else(|| reject("Parent block not yet submitted"))?;

        let mut expected_prev = parent;
        for header in &batch.headers {
            if header.prev_hash() != expected_prev {
                return Err(reject("Invalid previous block hash"));
            }
            expected_prev = header.block_hash();
        }

        if end_height <= tip.height {
            return Err(reject("Insufficient chain work"));
        }

        for (offset, header) in batch.headers.iter().enumerate() {
            state
                .records
                .insert(start_height + offset as u64, header.block_hash());
        }
        let (last_hash, last_time) = batch
            .headers
            .last()
            .map(|h| (h.block_hash(), h.time()))
            .ok_or_else(|| reject("No headers provided"))?;
        state.tip = Some(ChainTip::new(end_height, last_hash, last_time));
        state.accepted.push(SubmittedBatch {
            start_height,
            header_count: batch.len(),
            payload_len: headers.len(),
        });

        info!(
            "[relay] mirror accepted {} headers, new tip {}",
            batch.len(),
            end_height
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::build_header_chain;

    fn refs(from: u64, to: u64) -> Vec<RecordRef> {
        (from..=to).map(RecordRef::new).collect()
    }

    #[tokio::test]
    async fn test_uninitialized_tip_fails() {
        let mirror = InMemoryMirror::new();
        assert_eq!(mirror.tip().await.unwrap_err(), RelayError::MirrorUninitialized);
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let chain = build_header_chain(BlockHash::ZERO, 3, 0);
        let mirror = InMemoryMirror::with_chain(10, &chain);
        let stored = mirror.stored_hash(11).unwrap();

        mirror
            .provision_height_record(11, BlockHash::ZERO)
            .await
            .unwrap();
        assert_eq!(mirror.stored_hash(11), Some(stored));

        mirror
            .provision_height_record(13, BlockHash::ZERO)
            .await
            .unwrap();
        mirror
            .provision_height_record(13, BlockHash([5u8; 32]))
            .await
            .unwrap();
        assert_eq!(mirror.stored_hash(13), Some(BlockHash::ZERO));
        assert_eq!(mirror.provision_calls(), 3);
    }

    #[tokio::test]
    async fn test_accepts_linked_batch() {
        let chain = build_header_chain(BlockHash::ZERO, 5, 0);
        let mirror = InMemoryMirror::with_chain(100, &chain[..3]);
        for h in 103..=104 {
            mirror.provision_height_record(h, BlockHash::ZERO).await.unwrap();
        }

        let payload = HeaderBatch::new(103, chain[3..].to_vec()).payload();
        mirror
            .submit_header_batch(103, &payload, &refs(103, 104))
            .await
            .unwrap();

        let tip = mirror.tip().await.unwrap();
        assert_eq!(tip.height, 104);
        assert_eq!(tip.hash, chain[4].block_hash());
        assert_eq!(mirror.accepted_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_missing_records() {
        let chain = build_header_chain(BlockHash::ZERO, 5, 0);
        let mirror = InMemoryMirror::with_chain(100, &chain[..3]);

        let payload = HeaderBatch::new(103, chain[3..].to_vec()).payload();
        let err = mirror
            .submit_header_batch(103, &payload, &refs(103, 104))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::SubmissionRejected("Invalid account number".into()));
        assert_eq!(mirror.tip().await.unwrap().height, 102);
    }

    #[tokio::test]
    async fn test_rejects_broken_linkage() {
        let chain = build_header_chain(BlockHash::ZERO, 3, 0);
        let other = build_header_chain(BlockHash([9u8; 32]), 1, 1);
        let mirror = InMemoryMirror::with_chain(100, &chain);
        mirror.provision_height_record(103, BlockHash::ZERO).await.unwrap();

        let payload = HeaderBatch::new(103, other).payload();
        let err = mirror
            .submit_header_batch(103, &payload, &refs(103, 103))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RelayError::SubmissionRejected("Invalid previous block hash".into())
        );
    }

    #[tokio::test]
    async fn test_rejects_non_monotonic_height() {
        let chain = build_header_chain(BlockHash::ZERO, 3, 0);
        let mirror = InMemoryMirror::with_chain(100, &chain);
        let fork = build_header_chain(chain[0].block_hash(), 1, 4);

        let payload = HeaderBatch::new(101, fork).payload();
        let err = mirror
            .submit_header_batch(101, &payload, &refs(101, 101))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::SubmissionRejected("Insufficient chain work".into()));
    }

    #[tokio::test]
    async fn test_visibility_lag_hides_new_records() {
        let mirror = InMemoryMirror::new();
        mirror.initialize(0, BlockHash([1u8; 32]), 0);
        mirror.set_visibility_lag(2);
        mirror.provision_height_record(1, BlockHash::ZERO).await.unwrap();

        assert!(mirror.hash_record_at(1).await.unwrap().is_none());
        assert!(mirror.hash_record_at(1).await.unwrap().is_none());
        assert!(mirror.hash_record_at(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_injected_rejection_is_verbatim() {
        let mirror = InMemoryMirror::new();
        mirror.initialize(0, BlockHash([1u8; 32]), 0);
        mirror.reject_next_submission("Invalid proof of work");
        let err = mirror.submit_header_batch(1, &[], &[]).await.unwrap_err();
        assert_eq!(err, RelayError::SubmissionRejected("Invalid proof of work".into()));
    }
}
