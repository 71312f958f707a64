//! Ethereum JSON-RPC client with identity orchestration.
//!
//! Talks to an Ethereum-compatible node and a content-addressed store, and
//! composes nonce tracking, transaction building, signing, broadcast,
//! receipt polling and log decoding into identity flows. Addresses can be
//! rendered as MNIDs (chain-scoped, checksummed base58).

pub mod chain;
pub mod config;
pub mod error;
pub mod identity;
pub mod mnid;
pub mod observability;
pub mod rpc;
pub mod storage;

#[cfg(test)]
mod test_utils;

pub use config::ClientConfig;
pub use error::{IpcError, IpcResult};
pub use identity::IdentityOrchestrator;
pub use mnid::{Mnid, MnidError};
