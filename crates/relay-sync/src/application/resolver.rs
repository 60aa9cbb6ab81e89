//! # Reorg Resolver
//!
//! Finds the highest height at which the mirror and the source chain agree.
//!
//! The walk starts at the mirror tip and descends one height at a time,
//! stopping at the first match. It is strictly sequential: heights are
//! checked nearest-first and the loop short-circuits.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::algorithms::lookback_floor;
use crate::domain::{ChainTip, RelayError};
use crate::ports::outbound::{MirrorStateReader, SourceChainClient};

/// Common-ancestor search over a source chain and a mirror.
pub struct ReorgResolver<S: ?Sized, M: ?Sized> {
    source: Arc<S>,
    mirror: Arc<M>,
}

impl<S, M> ReorgResolver<S, M>
where
    S: SourceChainClient + ?Sized,
    M: MirrorStateReader + ?Sized,
{
    /// Create a resolver over `source` and `mirror`.
    pub fn new(source: Arc<S>, mirror: Arc<M>) -> Self {
        Self { source, mirror }
    }

    /// Highest height `h` in `[tip - max_lookback, tip]` where the mirror
    /// either holds the source hash or holds nothing at all.
    ///
    /// # Errors
    /// - `CatastrophicReorg` if every height in the range disagrees
    /// - any source or mirror error, unmodified
    pub async fn find_common_ancestor(
        &self,
        mirror_tip: &ChainTip,
        max_lookback: u64,
    ) -> Result<u64, RelayError> {
        let floor = lookback_floor(mirror_tip.height, max_lookback);

        for height in (floor..=mirror_tip.height).rev() {
            let source_hash = self.source.hash_at(height).await?;

            let record = match self.mirror.hash_record_at(height).await? {
                Some(record) => record,
                None => {
                    debug!("[relay] no mirror record at {}, treating as ancestor", height);
                    return Ok(height);
                }
            };

            if record.hash == source_hash {
                debug!("[relay] common ancestor at {}", height);
                return Ok(height);
            }

            warn!(
                "[relay] reorg detected at height {}: mirror {} != source {}",
                height, record.hash, source_hash
            );
        }

        Err(RelayError::CatastrophicReorg {
            mirror_tip: mirror_tip.height,
            max_lookback,
        })
    }
}
