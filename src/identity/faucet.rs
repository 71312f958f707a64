//! Test-network faucet client.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use serde::Deserialize;

use crate::chain::types::ZERO_HASH;
use crate::config::{FaucetMethod, NetworkEndpoint, TransportConfig};
use crate::config::validation::FAUCET_ADDRESS_PLACEHOLDER;
use crate::error::{IpcError, IpcResult};

#[derive(Debug, Deserialize)]
struct FaucetResponse {
    status: String,
    #[serde(default)]
    tx: Option<String>,
}

/// Asks a network's faucet to fund an address.
#[derive(Debug, Clone)]
pub struct Faucet {
    http: reqwest::Client,
}

impl Faucet {
    /// Faucet client with the transport's request timeout.
    pub fn new(config: &TransportConfig) -> IpcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IpcError::Transport(format!("failed to build faucet client: {e}")))?;
        Ok(Self { http })
    }

    /// Reuse an existing client, e.g. the one behind the RPC transport.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Request funds for `address`.
    ///
    /// Returns the funding transaction hash, or the zero hash when the
    /// network has no faucet, the faucet declined or it sent no `tx`.
    pub async fn fund(&self, endpoint: &NetworkEndpoint, address: &Address) -> IpcResult<B256> {
        if !endpoint.has_faucet() {
            tracing::debug!(network = %endpoint.name, "No faucet configured, skipping funding");
            return Ok(ZERO_HASH);
        }

        let url = endpoint
            .faucet_url_template
            .replace(FAUCET_ADDRESS_PLACEHOLDER, &address.to_checksum(None));

        let request = match endpoint.faucet_method {
            FaucetMethod::Get => self.http.get(&url),
            FaucetMethod::Post => self.http.post(&url),
        };

        let response = request
            .send()
            .await
            .map_err(|e| IpcError::Transport(format!("faucet: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IpcError::Faucet(format!("HTTP {status}")));
        }

        let body: FaucetResponse = response
            .json()
            .await
            .map_err(|e| IpcError::Faucet(format!("unreadable response: {e}")))?;

        if body.status != "OK" {
            tracing::warn!(network = %endpoint.name, %address, status = %body.status, "Faucet declined");
            return Ok(ZERO_HASH);
        }

        let Some(tx) = body.tx else {
            tracing::warn!(network = %endpoint.name, %address, "Faucet answered OK without a tx");
            return Ok(ZERO_HASH);
        };
        let hash = B256::from_str(&tx).map_err(|e| IpcError::Faucet(format!("bad tx hash '{tx}': {e}")))?;

        tracing::info!(network = %endpoint.name, %address, tx_hash = %hash, "Faucet funded account");
        Ok(hash)
    }
}
