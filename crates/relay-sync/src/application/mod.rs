//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.
//!
//! - `resolver`: common-ancestor walk
//! - `submitter`: fetch, provision, submit one batch
//! - `service`: one complete sync run
//! - `scheduler`: single-shot and daemon modes

pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod submitter;

pub use resolver::ReorgResolver;
pub use scheduler::{DaemonSummary, RunState, SyncScheduler};
pub use service::HeaderRelayService;
pub use submitter::HeaderBatchSubmitter;
