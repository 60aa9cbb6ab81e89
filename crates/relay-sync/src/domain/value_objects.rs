//! # Domain Value Objects
//!
//! Immutable value types for the header relay.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::errors::{Hash, RelayError};

/// Block hash in the chain's internal byte order.
///
/// Bitcoin RPC prints hashes in display order, which is the byte-reversed
/// form of the double-SHA256 digest. The mirror stores the internal
/// (little-endian) order, so that is what this type holds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockHash(pub Hash);

impl BlockHash {
    /// All-zero sentinel: a provisioned record not yet populated.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Raw bytes in internal order.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Is this the zero sentinel?
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a hash as printed by `getblockhash` (display order).
    pub fn from_display_hex(s: &str) -> Result<Self, RelayError> {
        let mut bytes = decode_hash_hex(s)?;
        bytes.reverse();
        Ok(Self(bytes))
    }

    /// Hex in display order, as accepted by `getblockheader`.
    pub fn to_display_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }

    /// Parse hex already in internal order.
    pub fn from_internal_hex(s: &str) -> Result<Self, RelayError> {
        decode_hash_hex(s).map(Self)
    }

    /// Hex in internal order.
    pub fn to_internal_hex(&self) -> String {
        hex::encode(self.0)
    }
}

fn decode_hash_hex(s: &str) -> Result<Hash, RelayError> {
    let bytes = hex::decode(s.trim())
        .map_err(|e| RelayError::Malformed(format!("block hash {:?}: {}", s, e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        RelayError::Malformed(format!("block hash must be 32 bytes, got {}", bytes.len()))
    })
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_display_hex())
    }
}

/// The mirror's last accepted header.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainTip {
    /// Height of the tip.
    pub height: u64,
    /// Tip hash, internal order.
    pub hash: BlockHash,
    /// Header timestamp of the tip.
    pub time: u32,
}

impl ChainTip {
    /// Create a new chain tip.
    pub fn new(height: u64, hash: BlockHash, time: u32) -> Self {
        Self { height, hash, time }
    }
}

/// Per-height bookkeeping record held by the external program.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeightHashRecord {
    /// Height this record is keyed by.
    pub height: u64,
    /// Stored hash, or [`BlockHash::ZERO`] if never populated.
    pub hash: BlockHash,
}

impl HeightHashRecord {
    /// Create a record.
    pub fn new(height: u64, hash: BlockHash) -> Self {
        Self { height, hash }
    }
}

/// Reference to a provisioned record, passed along with a batch submission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RecordRef {
    /// Height of the referenced record.
    pub height: u64,
}

impl RecordRef {
    /// Reference the record at `height`.
    pub fn new(height: u64) -> Self {
        Self { height }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record@{}", self.height)
    }
}

/// Heights submitted in one batch: the half-open range
/// `(common_height, target_height]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncWindow {
    /// Last height shared with the source chain.
    pub common_height: u64,
    /// Last height included in the batch.
    pub target_height: u64,
}

impl SyncWindow {
    /// Create a window. A target below the common height yields an empty window.
    pub fn new(common_height: u64, target_height: u64) -> Self {
        Self {
            common_height,
            target_height: target_height.max(common_height),
        }
    }

    /// First height in the batch.
    pub fn start_height(&self) -> u64 {
        self.common_height + 1
    }

    /// Number of headers in the batch.
    pub fn len(&self) -> u64 {
        self.target_height - self.common_height
    }

    /// Nothing to submit?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Heights in ascending order.
    pub fn heights(&self) -> RangeInclusive<u64> {
        self.start_height()..=self.target_height
    }
}

/// Result of one sync run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    /// Mirror tip read at the start of the run.
    pub mirror_tip: ChainTip,
    /// Source chain height read at the start of the run.
    pub source_height: u64,
    /// Common ancestor, if the run got that far.
    pub common_height: Option<u64>,
    /// Headers submitted in this run.
    pub submitted: u64,
    /// Duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl SyncReport {
    /// A run that found nothing to do.
    pub fn up_to_date(mirror_tip: ChainTip, source_height: u64, duration_ms: u64) -> Self {
        Self {
            mirror_tip,
            source_height,
            common_height: None,
            submitted: 0,
            duration_ms,
        }
    }

    /// A run that reconciled and (possibly) submitted.
    pub fn synced(
        mirror_tip: ChainTip,
        source_height: u64,
        common_height: u64,
        submitted: u64,
        duration_ms: u64,
    ) -> Self {
        Self {
            mirror_tip,
            source_height,
            common_height: Some(common_height),
            submitted,
            duration_ms,
        }
    }

    /// How many mirror heights were replaced because of a reorg.
    pub fn reorg_depth(&self) -> u64 {
        self.common_height
            .map(|common| self.mirror_tip.height.saturating_sub(common))
            .unwrap_or(0)
    }

    /// Mirror tip height after the run, assuming the submission was accepted.
    pub fn new_tip_height(&self) -> u64 {
        match self.common_height {
            Some(common) if self.submitted > 0 => common + self.submitted,
            _ => self.mirror_tip.height,
        }
    }
}
