//! # Algorithms Module
//!
//! Pure logic used by the sync run.
//!
//! - `window`: batch window and lookback arithmetic
//! - `linkage`: fetched-header integrity checks

pub mod linkage;
pub mod window;

pub use linkage::{validate_batch_linkage, verify_fetched_header};
pub use window::{compute_sync_window, lookback_floor};
