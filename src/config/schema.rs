//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{IpcError, IpcResult};

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// One endpoint record per supported network.
    pub networks: Vec<NetworkEndpoint>,

    /// HTTP transport settings.
    pub transport: TransportConfig,

    /// Receipt polling policy.
    pub receipts: ReceiptConfig,

    /// Defaults applied to outgoing transactions.
    pub transactions: TransactionDefaults,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Resolve the endpoint for a network id.
    pub fn endpoint(&self, network_id: u64) -> IpcResult<&NetworkEndpoint> {
        self.networks
            .iter()
            .find(|n| n.network_id == network_id)
            .ok_or(IpcError::UnknownNetwork(network_id))
    }
}

/// HTTP verb used to call a faucet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaucetMethod {
    Get,
    #[default]
    Post,
}

/// Static description of one network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkEndpoint {
    /// Network id (1 = mainnet, 3 = Ropsten, 0xa18e = CareChain, ...).
    pub network_id: u64,

    /// Name used in logs and published profiles.
    pub name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Identity manager contract, if deployed on this network.
    #[serde(default)]
    pub identity_manager_address: Option<Address>,

    /// Profile registry contract, if deployed on this network.
    #[serde(default)]
    pub registry_address: Option<Address>,

    /// Faucet URL containing `$ADDRESS`; empty when there is no faucet.
    #[serde(default)]
    pub faucet_url_template: String,

    #[serde(default)]
    pub faucet_method: FaucetMethod,

    /// Chain id for EIP-155 signing. `None` signs without replay protection.
    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl NetworkEndpoint {
    /// Whether this network has a faucet to fund fresh accounts.
    pub fn has_faucet(&self) -> bool {
        !self.faucet_url_template.trim().is_empty()
    }

    pub fn identity_manager(&self) -> IpcResult<Address> {
        self.identity_manager_address
            .ok_or_else(|| IpcError::MissingContractAddress {
                network: self.name.clone(),
                contract: "identity manager",
            })
    }

    pub fn registry(&self) -> IpcResult<Address> {
        self.registry_address
            .ok_or_else(|| IpcError::MissingContractAddress {
                network: self.name.clone(),
                contract: "registry",
            })
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Receipt polling policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Delay between `eth_getTransactionReceipt` polls in milliseconds.
    pub interval_ms: u64,

    /// Polls before giving up.
    pub max_attempts: u32,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_attempts: 120,
        }
    }
}

/// Defaults for transaction fee fields left at zero.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionDefaults {
    pub default_gas_limit: u64,
    pub default_gas_price_wei: u128,
}

impl Default for TransactionDefaults {
    fn default() -> Self {
        Self {
            default_gas_limit: 350_000,
            default_gas_price_wei: 20_000_000_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
