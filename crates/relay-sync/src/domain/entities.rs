//! # Domain Entities
//!
//! Bitcoin block headers and header batches.

use sha2::{Digest, Sha256};

use super::errors::{Hash, RelayError};
use super::invariants::HEADER_SIZE;
use super::value_objects::BlockHash;

/// Raw 80-byte Bitcoin block header, exactly as transmitted by the source.
///
/// Layout (all integers little-endian):
///
/// ```text
/// version(4) | prev_hash(32) | merkle_root(32) | time(4) | bits(4) | nonce(4)
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    raw: [u8; HEADER_SIZE],
}

impl BlockHeader {
    /// Assemble a header from its fields.
    pub fn new(
        version: i32,
        prev_hash: BlockHash,
        merkle_root: Hash,
        time: u32,
        bits: u32,
        nonce: u32,
    ) -> Self {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(&version.to_le_bytes());
        raw[4..36].copy_from_slice(prev_hash.as_bytes());
        raw[36..68].copy_from_slice(&merkle_root);
        raw[68..72].copy_from_slice(&time.to_le_bytes());
        raw[72..76].copy_from_slice(&bits.to_le_bytes());
        raw[76..80].copy_from_slice(&nonce.to_le_bytes());
        Self { raw }
    }

    /// Decode from raw bytes.
    ///
    /// # Errors
    /// - `InvalidHeader` if the input is not exactly 80 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RelayError> {
        let raw: [u8; HEADER_SIZE] = bytes.try_into().map_err(|_| {
            RelayError::InvalidHeader(format!(
                "header must be {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self { raw })
    }

    /// Decode from hex, as returned by `getblockheader <hash> false`.
    pub fn from_hex(s: &str) -> Result<Self, RelayError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| RelayError::Malformed(format!("header hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Raw serialized header.
    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }

    /// Block version.
    pub fn version(&self) -> i32 {
        i32::from_le_bytes(self.word(0))
    }

    /// Hash of the previous block, internal order.
    pub fn prev_hash(&self) -> BlockHash {
        BlockHash(self.slice32(4))
    }

    /// Merkle root of the block's transactions.
    pub fn merkle_root(&self) -> Hash {
        self.slice32(36)
    }

    /// Header timestamp.
    pub fn time(&self) -> u32 {
        u32::from_le_bytes(self.word(68))
    }

    /// Compact difficulty target.
    pub fn bits(&self) -> u32 {
        u32::from_le_bytes(self.word(72))
    }

    /// Proof-of-work nonce.
    pub fn nonce(&self) -> u32 {
        u32::from_le_bytes(self.word(76))
    }

    /// Double SHA-256 of the raw header, internal order.
    pub fn block_hash(&self) -> BlockHash {
        let first = Sha256::digest(self.raw);
        let second = Sha256::digest(first);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&second);
        BlockHash(hash)
    }

    fn word(&self, at: usize) -> [u8; 4] {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.raw[at..at + 4]);
        word
    }

    fn slice32(&self, at: usize) -> Hash {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.raw[at..at + 32]);
        out
    }
}

impl std::fmt::Debug for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockHeader")
            .field("hash", &self.block_hash())
            .field("prev_hash", &self.prev_hash())
            .field("time", &self.time())
            .field("bits", &format_args!("{:#010x}", self.bits()))
            .finish()
    }
}

/// Contiguous run of headers starting at `start_height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderBatch {
    /// Height of the first header.
    pub start_height: u64,
    /// Headers in ascending height order.
    pub headers: Vec<BlockHeader>,
}

impl HeaderBatch {
    /// Create a batch.
    pub fn new(start_height: u64, headers: Vec<BlockHeader>) -> Self {
        Self {
            start_height,
            headers,
        }
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Is the batch empty?
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Height of the last header, if any.
    pub fn end_height(&self) -> Option<u64> {
        if self.headers.is_empty() {
            None
        } else {
            Some(self.start_height + self.headers.len() as u64 - 1)
        }
    }

    /// Concatenated raw headers, in order.
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.headers.len() * HEADER_SIZE);
        for header in &self.headers {
            payload.extend_from_slice(header.as_bytes());
        }
        payload
    }

    /// Split a payload back into headers.
    pub fn from_payload(start_height: u64, payload: &[u8]) -> Result<Self, RelayError> {
        if payload.len() % HEADER_SIZE != 0 {
            return Err(RelayError::InvalidHeader(format!(
                "payload length {} is not a multiple of {}",
                payload.len(),
                HEADER_SIZE
            )));
        }
        let headers = payload
            .chunks_exact(HEADER_SIZE)
            .map(BlockHeader::from_bytes)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(start_height, headers))
    }
}
