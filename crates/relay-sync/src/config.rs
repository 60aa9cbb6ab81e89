//! # Sync Configuration
//!
//! Tuning knobs for one relay instance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{
    RelayError, DEFAULT_MAX_BATCH, DEFAULT_MAX_LOOKBACK, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_TICK_INTERVAL_SECS,
};

/// Header relay configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum headers submitted in one batch.
    pub max_batch: u64,

    /// Maximum heights the reorg walk may descend below the mirror tip.
    pub max_lookback: u64,

    /// Daemon tick interval in seconds.
    pub tick_interval_secs: u64,

    /// Pause after provisioning records before submitting, in milliseconds.
    ///
    /// The ledger does not guarantee read-after-write visibility of freshly
    /// created records.
    pub settle_delay_ms: u64,

    /// How many times to poll for a provisioned record before giving up.
    pub visibility_poll_attempts: u32,

    /// Pause between visibility polls, in milliseconds.
    pub visibility_poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
            max_lookback: DEFAULT_MAX_LOOKBACK,
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            visibility_poll_attempts: 5,
            visibility_poll_interval_ms: 1_000,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (no settling pauses).
    pub fn for_testing() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
            max_lookback: DEFAULT_MAX_LOOKBACK,
            tick_interval_secs: 1,
            settle_delay_ms: 0,
            visibility_poll_attempts: 3,
            visibility_poll_interval_ms: 0,
        }
    }

    /// Daemon tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Pause after provisioning.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Pause between visibility polls.
    pub fn visibility_poll_interval(&self) -> Duration {
        Duration::from_millis(self.visibility_poll_interval_ms)
    }

    /// Reject configurations that can never make progress.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.max_batch == 0 {
            return Err(RelayError::InvalidConfig(
                "max_batch must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(RelayError::InvalidConfig(
                "tick_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.visibility_poll_attempts == 0 {
            return Err(RelayError::InvalidConfig(
                "visibility_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
