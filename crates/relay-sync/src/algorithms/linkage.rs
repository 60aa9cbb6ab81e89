//! # Header Linkage
//!
//! Integrity checks on headers fetched from the source chain.
//!
//! These only check that the node handed back what was asked for and that
//! the run is contiguous. Proof-of-work and difficulty stay with the mirror
//! program.

use crate::domain::{BlockHash, BlockHeader, HeaderBatch, RelayError};

/// Check that a header fetched for `height` hashes to the advertised hash.
pub fn verify_fetched_header(
    height: u64,
    expected: &BlockHash,
    header: &BlockHeader,
) -> Result<(), RelayError> {
    let actual = header.block_hash();
    if actual != *expected {
        return Err(RelayError::InvalidHeader(format!(
            "header at height {} hashes to {}, source advertised {}",
            height, actual, expected
        )));
    }
    Ok(())
}

/// Validate a batch for chain continuity.
///
/// # Checks
/// 1. Each header's `prev_hash` equals the previous header's hash
/// 2. No empty batch reaches the mirror
pub fn validate_batch_linkage(batch: &HeaderBatch) -> Result<(), RelayError> {
    if batch.is_empty() {
        return Err(RelayError::InvalidHeader("empty header batch".to_string()));
    }

    for (offset, window) in batch.headers.windows(2).enumerate() {
        let prev = &window[0];
        let curr = &window[1];
        if curr.prev_hash() != prev.block_hash() {
            return Err(RelayError::InvalidHeader(format!(
                "broken chain at height {}: expected parent {}, got {}",
                batch.start_height + offset as u64 + 1,
                prev.block_hash(),
                curr.prev_hash()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::build_header_chain;

    #[test]
    fn test_verify_fetched_header_matches() {
        let chain = build_header_chain(BlockHash::ZERO, 1, 0);
        let hash = chain[0].block_hash();
        assert!(verify_fetched_header(1, &hash, &chain[0]).is_ok());
    }

    #[test]
    fn test_verify_fetched_header_mismatch() {
        let chain = build_header_chain(BlockHash::ZERO, 2, 0);
        let wrong = chain[1].block_hash();
        let err = verify_fetched_header(1, &wrong, &chain[0]).unwrap_err();
        assert!(matches!(err, RelayError::InvalidHeader(_)));
    }

    #[test]
    fn test_linkage_valid() {
        let chain = build_header_chain(BlockHash([3u8; 32]), 5, 0);
        assert!(validate_batch_linkage(&HeaderBatch::new(10, chain)).is_ok());
    }

    #[test]
    fn test_linkage_broken() {
        let mut chain = build_header_chain(BlockHash([3u8; 32]), 3, 0);
        let fork = build_header_chain(BlockHash([4u8; 32]), 1, 9);
        chain[2] = fork[0];
        let err = validate_batch_linkage(&HeaderBatch::new(10, chain)).unwrap_err();
        assert!(err.to_string().contains("height 12"));
    }

    #[test]
    fn test_linkage_rejects_empty() {
        assert!(validate_batch_linkage(&HeaderBatch::new(1, vec![])).is_err());
    }
}
