//! Mock Source Chain Adapter
//!
//! In-memory `SourceChainClient` holding a height-indexed header chain,
//! with reorg simulation and failure injection for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{BlockHash, BlockHeader, Lookup, RelayError};
use crate::ports::outbound::SourceChainClient;

/// Regtest-style compact target; the relay never checks work.
const MOCK_BITS: u32 = 0x207f_ffff;

/// Build `count` linked headers on top of `parent`.
///
/// `salt` separates forks built on the same parent.
pub fn build_header_chain(parent: BlockHash, count: usize, salt: u32) -> Vec<BlockHeader> {
    let mut headers = Vec::with_capacity(count);
    let mut prev = parent;
    for i in 0..count {
        let mut merkle_root = [0u8; 32];
        merkle_root[..4].copy_from_slice(&salt.to_le_bytes());
        merkle_root[4..12].copy_from_slice(&(i as u64).to_le_bytes());
        let header = BlockHeader::new(
            0x2000_0000,
            prev,
            merkle_root,
            1_700_000_000 + (i as u32) * 600,
            MOCK_BITS,
            salt,
        );
        prev = header.block_hash();
        headers.push(header);
    }
    headers
}

struct MockChain {
    base_height: u64,
    headers: Vec<BlockHeader>,
    // Stale fork headers stay resolvable by hash, as on a real node.
    by_hash: HashMap<BlockHash, BlockHeader>,
}

/// Mock source chain for testing.
pub struct MockSourceChain {
    chain: RwLock<MockChain>,
    fail_next: AtomicUsize,
    height_requests: AtomicUsize,
    hash_requests: AtomicUsize,
    header_requests: AtomicUsize,
}

impl MockSourceChain {
    /// Chain whose first header sits at `base_height`. `headers` must be non-empty.
    pub fn new(base_height: u64, headers: Vec<BlockHeader>) -> Self {
        let by_hash = headers.iter().map(|h| (h.block_hash(), *h)).collect();
        Self {
            chain: RwLock::new(MockChain {
                base_height,
                headers,
                by_hash,
            }),
            fail_next: AtomicUsize::new(0),
            height_requests: AtomicUsize::new(0),
            hash_requests: AtomicUsize::new(0),
            header_requests: AtomicUsize::new(0),
        }
    }

    /// Fresh synthetic chain of `count` headers starting at `base_height`.
    pub fn synthetic(base_height: u64, count: usize) -> Self {
        Self::new(base_height, build_header_chain(BlockHash::ZERO, count, 0))
    }

    /// Best height.
    pub fn tip_height(&self) -> u64 {
        let chain = self.chain.read();
        (chain.base_height + chain.headers.len() as u64).saturating_sub(1)
    }

    /// Header at `height` on the current best chain.
    pub fn header_at_height(&self, height: u64) -> Option<BlockHeader> {
        let chain = self.chain.read();
        let offset = height.checked_sub(chain.base_height)?;
        chain.headers.get(offset as usize).copied()
    }

    /// Hash at `height` on the current best chain.
    pub fn hash_at_height(&self, height: u64) -> Option<BlockHash> {
        self.header_at_height(height).map(|h| h.block_hash())
    }

    /// Replace everything above `fork_height` with `replacement`.
    ///
    /// `replacement` should be built on the hash at `fork_height`.
    pub fn reorg_from(&self, fork_height: u64, replacement: Vec<BlockHeader>) {
        let mut chain = self.chain.write();
        let keep = (fork_height + 1).saturating_sub(chain.base_height) as usize;
        chain.headers.truncate(keep);
        for header in replacement {
            chain.by_hash.insert(header.block_hash(), header);
            chain.headers.push(header);
        }
    }

    /// Make the next `count` calls fail with `SourceUnavailable`.
    pub fn fail_next_calls(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Number of `height` calls served.
    pub fn height_requests(&self) -> usize {
        self.height_requests.load(Ordering::SeqCst)
    }

    /// Number of `hash_at` calls served.
    pub fn hash_requests(&self) -> usize {
        self.hash_requests.load(Ordering::SeqCst)
    }

    /// Number of `header_at` calls served.
    pub fn header_requests(&self) -> usize {
        self.header_requests.load(Ordering::SeqCst)
    }

    fn injected_failure(&self) -> Result<(), RelayError> {
        let pending = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(RelayError::SourceUnavailable(
                "mock: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceChainClient for MockSourceChain {
    async fn height(&self) -> Result<u64, RelayError> {
        self.height_requests.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(self.tip_height())
    }

    async fn hash_at(&self, height: u64) -> Result<BlockHash, RelayError> {
        self.hash_requests.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        self.hash_at_height(height)
            .ok_or(RelayError::NotFound(Lookup::Height(height)))
    }

    async fn header_at(&self, hash: &BlockHash) -> Result<BlockHeader, RelayError> {
        self.header_requests.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        self.chain
            .read()
            .by_hash
            .get(hash)
            .copied()
            .ok_or(RelayError::NotFound(Lookup::Hash(*hash)))
    }
}
