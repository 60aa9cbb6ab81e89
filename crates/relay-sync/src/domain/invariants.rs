//! # Domain Invariants
//!
//! Rules every sync run must respect, plus the default bounds.

use super::errors::RelayError;
use super::value_objects::SyncWindow;

/// Size of a serialized Bitcoin block header.
pub const HEADER_SIZE: usize = 80;

/// Default maximum headers submitted in one batch.
pub const DEFAULT_MAX_BATCH: u64 = 10;

/// Default number of heights the reorg walk may descend below the mirror tip.
pub const DEFAULT_MAX_LOOKBACK: u64 = 50;

/// Default daemon tick interval in seconds.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;

/// Default pause after provisioning records, in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 5_000;

/// Invariant: a batch payload for `(a, b]` is exactly `(b - a) * 80` bytes.
pub fn invariant_payload_contiguous(
    window: &SyncWindow,
    payload_len: usize,
) -> Result<(), RelayError> {
    let expected = window.len() as usize * HEADER_SIZE;
    if payload_len != expected {
        return Err(RelayError::InvalidHeader(format!(
            "payload for heights {}..={} is {} bytes, expected {}",
            window.start_height(),
            window.target_height,
            payload_len,
            expected
        )));
    }
    Ok(())
}

/// Invariant: never more than `max_batch` headers in one call.
pub fn invariant_batch_bound(window: &SyncWindow, max_batch: u64) -> bool {
    window.len() <= max_batch
}

/// Invariant: the common ancestor lies in `[tip - max_lookback, tip]`.
pub fn invariant_ancestor_in_bounds(mirror_tip: u64, max_lookback: u64, ancestor: u64) -> bool {
    ancestor <= mirror_tip && ancestor >= mirror_tip.saturating_sub(max_lookback)
}
