//! # Relay Sync
//!
//! Keeps a mirror of the Bitcoin header chain, stored inside an external
//! ledger program, in step with a Bitcoin node.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Each run reads the mirror tip and the source tip, walks back from the
//! mirror tip to the highest height both chains agree on, and submits the
//! next batch of raw 80-byte headers in one atomic call. The ledger
//! program validates linkage and proof-of-work; the relay only moves data.
//!
//! ## Safety Bounds
//!
//! | Bound | Default | Effect |
//! |-------|---------|--------|
//! | `max_batch` | 10 | Headers per submission |
//! | `max_lookback` | 50 | Reorg depth healed automatically |
//! | Run flag | - | At most one run in flight per process |
//!
//! ## Module Structure
//!
//! ```text
//! relay-sync/
//! ├── domain/          # BlockHash, BlockHeader, ChainTip, SyncWindow, RelayError
//! ├── algorithms/      # Window arithmetic, fetched-header linkage checks
//! ├── ports/           # HeaderRelayApi (inbound) + source/mirror traits (outbound)
//! ├── application/     # ReorgResolver, HeaderBatchSubmitter, service, scheduler
//! ├── adapters/        # bitcoind RPC, ledger gateway, in-memory doubles
//! └── config.rs        # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    build_header_chain, BitcoinRpcClient, InMemoryMirror, JsonRpcMirrorClient, MockSourceChain,
    RpcCredentials, SubmittedBatch,
};
pub use algorithms::{compute_sync_window, validate_batch_linkage, verify_fetched_header};
pub use application::{
    DaemonSummary, HeaderBatchSubmitter, HeaderRelayService, ReorgResolver, RunState,
    SyncScheduler,
};
pub use config::SyncConfig;
pub use domain::{
    BlockHash, BlockHeader, ChainTip, Hash, HeaderBatch, HeightHashRecord, Lookup, RecordRef,
    RelayError, SyncReport, SyncWindow, DEFAULT_MAX_BATCH, DEFAULT_MAX_LOOKBACK, HEADER_SIZE,
};
pub use ports::{HeaderRelayApi, MirrorLedger, MirrorStateReader, MirrorWriter, SourceChainClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
