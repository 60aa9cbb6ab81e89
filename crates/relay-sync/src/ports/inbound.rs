//! # Inbound Ports
//!
//! API trait defining what the header relay can do.

use async_trait::async_trait;

use crate::domain::{RelayError, SyncReport};

/// Header relay API - inbound port.
///
/// One call is one complete run: read both tips, reconcile, submit at most
/// one batch. Runs hold no state between calls.
#[async_trait]
pub trait HeaderRelayApi: Send + Sync {
    /// Perform a single sync run.
    async fn sync_once(&self) -> Result<SyncReport, RelayError>;
}
