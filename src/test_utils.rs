//! Shared helpers for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{FaucetMethod, NetworkEndpoint};
use crate::error::{IpcError, IpcResult};
use crate::rpc::RpcTransport;

/// Endpoint pointing nowhere; scripted transports never dial it.
pub fn test_endpoint() -> NetworkEndpoint {
    NetworkEndpoint {
        network_id: 0xff,
        name: "local".to_string(),
        rpc_url: "http://127.0.0.1:1".to_string(),
        identity_manager_address: Some("0x7c338672f483795eca47106dc395660d95041dbe".parse().unwrap()),
        registry_address: Some("0x2cc31912b2b0f3075a87b3640923d45a26cef3ee".parse().unwrap()),
        faucet_url_template: String::new(),
        faucet_method: FaucetMethod::Post,
        chain_id: Some(0xff),
    }
}

/// A node stand-in that answers from per-method scripts and records calls.
///
/// Queued responses are consumed first; after that the fixed response for
/// the method (if any) is returned on every call.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<IpcResult<Value>>>>,
    fixed: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, method: &str, response: IpcResult<Value>) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn respond(&self, method: &str, result: Value) {
        self.fixed.lock().unwrap().insert(method.to_string(), result);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params)
            .collect()
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(&self, _endpoint: &NetworkEndpoint, method: &str, params: Value) -> IpcResult<Value> {
        self.calls.lock().unwrap().push((method.to_string(), params));

        if let Some(response) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }

        self.fixed
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .ok_or_else(|| IpcError::Rpc {
                code: -32601,
                message: format!("no script for {method}"),
            })
    }
}
