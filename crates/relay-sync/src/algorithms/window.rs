//! # Sync Window
//!
//! Pure arithmetic deciding which heights a run touches.

use crate::domain::SyncWindow;

/// Compute the batch window for one run.
///
/// `target = min(source_tip, common + max_batch)`. A target at or below the
/// common height produces an empty window.
pub fn compute_sync_window(common_height: u64, source_tip: u64, max_batch: u64) -> SyncWindow {
    let target = source_tip.min(common_height.saturating_add(max_batch));
    SyncWindow::new(common_height, target)
}

/// Lowest height the reorg walk may inspect.
pub fn lookback_floor(mirror_tip: u64, max_lookback: u64) -> u64 {
    mirror_tip.saturating_sub(max_lookback)
}
