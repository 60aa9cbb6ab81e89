//! # Header Relay Service
//!
//! Application service performing one sync run: read both tips, find the
//! common ancestor, submit at most one batch.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use super::resolver::ReorgResolver;
use super::submitter::HeaderBatchSubmitter;
use crate::config::SyncConfig;
use crate::domain::{ChainTip, Lookup, RelayError, SyncReport};
use crate::ports::inbound::HeaderRelayApi;
use crate::ports::outbound::{MirrorLedger, SourceChainClient};

/// Header Relay Service - orchestrates a sync run.
pub struct HeaderRelayService<S: ?Sized, M: ?Sized> {
    /// Configuration.
    config: SyncConfig,
    /// Source chain client.
    source: Arc<S>,
    /// Mirror ledger.
    mirror: Arc<M>,
    /// Common-ancestor search.
    resolver: ReorgResolver<S, M>,
    /// Batch submission.
    submitter: HeaderBatchSubmitter<S, M>,
}

impl<S, M> HeaderRelayService<S, M>
where
    S: SourceChainClient + ?Sized,
    M: MirrorLedger + ?Sized,
{
    /// Create a new relay service.
    pub fn new(config: SyncConfig, source: Arc<S>, mirror: Arc<M>) -> Self {
        Self {
            resolver: ReorgResolver::new(source.clone(), mirror.clone()),
            submitter: HeaderBatchSubmitter::new(source.clone(), mirror.clone(), config.clone()),
            config,
            source,
            mirror,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns `(common_height, submitted)`.
    async fn reconcile(
        &self,
        mirror_tip: &ChainTip,
        source_height: u64,
    ) -> Result<(u64, u64), RelayError> {
        let common = self
            .resolver
            .find_common_ancestor(mirror_tip, self.config.max_lookback)
            .await?;
        if common < mirror_tip.height {
            info!(
                reorg_depth = mirror_tip.height - common,
                "[relay] reorg: rewinding mirror from {} to {}",
                mirror_tip.height,
                common
            );
        }

        let submitted = self
            .submitter
            .submit(common, source_height, self.config.max_batch)
            .await?;
        Ok((common, submitted))
    }

    /// A height vanished mid-run. If the source chain shrank past it there
    /// is simply nothing to do; otherwise the error stands.
    async fn shrunk_chain_report(
        &self,
        err: RelayError,
        mirror_tip: ChainTip,
        started: Instant,
    ) -> Result<SyncReport, RelayError> {
        let missing = match err {
            RelayError::NotFound(Lookup::Height(height)) => height,
            other => return Err(other),
        };

        let current = self.source.height().await?;
        if missing >= current {
            debug!(
                "[relay] height {} gone from source (tip now {}), nothing to sync",
                missing, current
            );
            return Ok(SyncReport::up_to_date(
                mirror_tip,
                current,
                started.elapsed().as_millis() as u64,
            ));
        }
        Err(RelayError::NotFound(Lookup::Height(missing)))
    }
}

#[async_trait]
impl<S, M> HeaderRelayApi for HeaderRelayService<S, M>
where
    S: SourceChainClient + ?Sized + 'static,
    M: MirrorLedger + ?Sized + 'static,
{
    async fn sync_once(&self) -> Result<SyncReport, RelayError> {
        let started = Instant::now();

        let mirror_tip = self.mirror.tip().await?;
        let source_height = self.source.height().await?;
        debug!(
            "[relay] mirror tip {} ({}), source tip {}",
            mirror_tip.height, mirror_tip.hash, source_height
        );

        if source_height <= mirror_tip.height {
            info!("[relay] up to date at {}", mirror_tip.height);
            return Ok(SyncReport::up_to_date(
                mirror_tip,
                source_height,
                started.elapsed().as_millis() as u64,
            ));
        }

        let report = match self.reconcile(&mirror_tip, source_height).await {
            Ok((common, submitted)) => SyncReport::synced(
                mirror_tip,
                source_height,
                common,
                submitted,
                started.elapsed().as_millis() as u64,
            ),
            Err(err) => return self.shrunk_chain_report(err, mirror_tip, started).await,
        };

        info!(
            submitted = report.submitted,
            reorg_depth = report.reorg_depth(),
            duration_ms = report.duration_ms,
            "[relay] sync complete: mirror tip {} -> {}, source tip {}",
            report.mirror_tip.height,
            report.new_tip_height(),
            report.source_height
        );
        Ok(report)
    }
}
