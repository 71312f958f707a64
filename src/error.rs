//! Error taxonomy shared by every subsystem.
//!
//! Every RPC-calling operation fails fast with the first error it meets.
//! Zero hashes and zero addresses are valid sentinels and never show up here.

use alloy::primitives::B256;
use thiserror::Error;

use crate::mnid::MnidError;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Connectivity or HTTP failure talking to a node, faucet or store.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A result was present but not of the expected shape.
    #[error("Unexpected result for {method}: {reason}")]
    Schema { method: String, reason: String },

    /// MNID decoding failed.
    #[error(transparent)]
    Mnid(#[from] MnidError),

    /// No contract interface is registered under this name.
    #[error("Contract interface not found: {0}")]
    ContractNotFound(String),

    /// The contract interface has no method with this name.
    #[error("Method {method} not found in contract {contract}")]
    MethodNotFound { contract: String, method: String },

    /// Arguments could not be encoded for the contract call.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The account refused or failed to sign.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Account creation or unlock failed.
    #[error("Key custody error: {0}")]
    Custody(String),

    /// Content store put/get failed.
    #[error("Content store error: {0}")]
    ContentStore(String),

    /// Faucet answered with something other than a funding response.
    #[error("Faucet error: {0}")]
    Faucet(String),

    /// Receipt polling gave up.
    #[error("Transaction {hash} not mined after {attempts} polls")]
    ReceiptTimeout { hash: B256, attempts: u32 },

    /// A setting built in code is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    Reverted(B256),

    /// The flow was cancelled by its caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// No endpoint is configured for this network id.
    #[error("Unknown network id {0:#x}")]
    UnknownNetwork(u64),

    /// The network has no address configured for a contract the flow needs.
    #[error("Network {network} has no {contract} address configured")]
    MissingContractAddress { network: String, contract: &'static str },
}

impl IpcError {
    pub(crate) fn schema(method: &str, reason: impl Into<String>) -> Self {
        IpcError::Schema {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for client operations.
pub type IpcResult<T> = Result<T, IpcError>;
