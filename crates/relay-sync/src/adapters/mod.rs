//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits: bitcoind JSON-RPC for the source
//! chain, a JSON-RPC ledger gateway for the mirror, and in-memory
//! doubles for tests and dry runs.

mod bitcoin_rpc;
mod json_rpc;
mod memory_mirror;
mod mirror_gateway;
mod mock_source;
#[cfg(test)]
mod test_server;

pub use bitcoin_rpc::BitcoinRpcClient;
pub use json_rpc::{JsonRpcError, JsonRpcTransport, RpcCallError, RpcCredentials};
pub use memory_mirror::{InMemoryMirror, SubmittedBatch};
pub use mirror_gateway::{JsonRpcMirrorClient, GATEWAY_MIRROR_UNINITIALIZED};
pub use mock_source::{build_header_chain, MockSourceChain};
