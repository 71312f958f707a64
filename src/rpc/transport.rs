//! JSON-RPC transport.
//!
//! # Responsibilities
//! - POST a JSON-RPC 2.0 request to the endpoint's RPC URL
//! - Map connectivity/HTTP failures to `Transport` and node errors to `Rpc`
//! - Leave result shape validation to the caller

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{NetworkEndpoint, TransportConfig};
use crate::error::{IpcError, IpcResult};
use crate::observability::metrics;
use crate::rpc::types::{into_result, JsonRpcRequest};

/// Sends one JSON-RPC call and returns its `result` member.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, endpoint: &NetworkEndpoint, method: &str, params: Value) -> IpcResult<Value>;
}

/// `reqwest`-backed HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> IpcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IpcError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wrap an existing client, e.g. one shared with the faucet.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn post(&self, endpoint: &NetworkEndpoint, method: &str, params: &Value) -> IpcResult<Value> {
        let request = JsonRpcRequest::new(method, params);

        let response = self
            .http
            .post(&endpoint.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IpcError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IpcError::Transport(format!(
                "{method}: node returned HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IpcError::Transport(format!("{method}: unreadable response: {e}")))?;

        into_result(method, body)
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, endpoint: &NetworkEndpoint, method: &str, params: Value) -> IpcResult<Value> {
        tracing::debug!(network = %endpoint.name, method, "RPC call");

        let result = self.post(endpoint, method, &params).await;
        metrics::record_rpc_call(method, result.is_ok());

        if let Err(e) = &result {
            tracing::warn!(network = %endpoint.name, method, error = %e, "RPC call failed");
        }
        result
    }
}
