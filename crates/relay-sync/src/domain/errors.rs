//! # Domain Errors
//!
//! Error types for the header relay.
//!
//! Leaf clients raise these and they bubble unmodified through the resolver
//! and submitter. Only the scheduler decides whether an error ends the
//! process or gets logged and retried on the next tick.

use std::fmt;

use thiserror::Error;

use super::value_objects::BlockHash;

/// Raw 32-byte hash type alias.
pub type Hash = [u8; 32];

/// Item that could not be found on the source chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// No block at this height.
    Height(u64),
    /// No header with this hash.
    Hash(BlockHash),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Height(height) => write!(f, "block at height {}", height),
            Lookup::Hash(hash) => write!(f, "header {}", hash),
        }
    }
}

/// Header relay error types.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Transport or authentication failure reaching the source chain.
    #[error("Source chain unavailable: {0}")]
    SourceUnavailable(String),

    /// Requested height or hash does not exist on the source chain.
    #[error("Not found on source chain: {0}")]
    NotFound(Lookup),

    /// The mirror has no genesis state yet.
    #[error("Mirror is not initialized")]
    MirrorUninitialized,

    /// Transport failure reaching the external ledger program.
    #[error("Mirror unavailable: {0}")]
    MirrorUnavailable(String),

    /// No common ancestor within the lookback bound.
    #[error(
        "No common ancestor within {max_lookback} blocks below mirror tip {mirror_tip}. Catastrophic reorg?"
    )]
    CatastrophicReorg {
        /// Mirror tip height the walk started from.
        mirror_tip: u64,
        /// Lookback bound that was exhausted.
        max_lookback: u64,
    },

    /// The external program refused the batch. Message is kept verbatim.
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// A fetched header failed integrity checks (length, hash, linkage).
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A response could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RelayError {
    /// Whether the daemon should simply retry on the next tick.
    ///
    /// Rejected submissions and bad configuration are not transient:
    /// retrying them blindly is unsafe or pointless.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            RelayError::SubmissionRejected(_) | RelayError::InvalidConfig(_)
        )
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::SourceUnavailable(_) => "source_unavailable",
            RelayError::NotFound(_) => "not_found",
            RelayError::MirrorUninitialized => "mirror_uninitialized",
            RelayError::MirrorUnavailable(_) => "mirror_unavailable",
            RelayError::CatastrophicReorg { .. } => "catastrophic_reorg",
            RelayError::SubmissionRejected(_) => "submission_rejected",
            RelayError::InvalidHeader(_) => "invalid_header",
            RelayError::Malformed(_) => "malformed",
            RelayError::InvalidConfig(_) => "invalid_config",
        }
    }
}
