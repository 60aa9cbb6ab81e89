//! # Outbound Ports
//!
//! Traits for the two external collaborators: the Bitcoin node the relay
//! reads from, and the ledger program hosting the mirror.
//!
//! Implementations never retry; retry policy belongs to the scheduler.

use async_trait::async_trait;

use crate::domain::{BlockHash, BlockHeader, ChainTip, HeightHashRecord, RecordRef, RelayError};

/// Source chain client - outbound port.
///
/// Failures: `SourceUnavailable` on transport/auth errors, `NotFound` when
/// the requested item does not exist.
#[async_trait]
pub trait SourceChainClient: Send + Sync {
    /// Current best height of the source chain.
    async fn height(&self) -> Result<u64, RelayError>;

    /// Block hash at `height`, internal byte order.
    async fn hash_at(&self, height: u64) -> Result<BlockHash, RelayError>;

    /// Raw 80-byte header for `hash`.
    async fn header_at(&self, hash: &BlockHash) -> Result<BlockHeader, RelayError>;
}

/// Mirror state reader - outbound port. Read-only, side-effect free.
#[async_trait]
pub trait MirrorStateReader: Send + Sync {
    /// The mirror's current tip.
    ///
    /// # Errors
    /// - `MirrorUninitialized` if no genesis has been set
    async fn tip(&self) -> Result<ChainTip, RelayError>;

    /// The record at `height`, or `None` if it was never provisioned.
    async fn hash_record_at(&self, height: u64) -> Result<Option<HeightHashRecord>, RelayError>;
}

/// Mirror writer - outbound port.
#[async_trait]
pub trait MirrorWriter: Send + Sync {
    /// Create the record at `height` holding `initial_hash`.
    ///
    /// Idempotent: an existing record is left untouched.
    async fn provision_height_record(
        &self,
        height: u64,
        initial_hash: BlockHash,
    ) -> Result<RecordRef, RelayError>;

    /// Submit concatenated headers starting at `start_height` as one atomic
    /// write. The program checks linkage, proof-of-work and height
    /// monotonicity and rejects the whole batch on any violation.
    async fn submit_header_batch(
        &self,
        start_height: u64,
        headers: &[u8],
        records: &[RecordRef],
    ) -> Result<(), RelayError>;
}

/// Full ledger access: reads plus writes.
pub trait MirrorLedger: MirrorStateReader + MirrorWriter {}

impl<T: MirrorStateReader + MirrorWriter + ?Sized> MirrorLedger for T {}
