//! Typed Ethereum node client.
//!
//! # Responsibilities
//! - Wrap each node method with its parameter encoding
//! - Validate result shapes; a node answering with the wrong shape is a
//!   `Schema` error, never a silently defaulted value
//! - Scan recent history for an account's transactions

use std::sync::Arc;

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::chain::types::{BlockInfo, Transaction, TransactionInfo, TransactionReceipt};
use crate::config::NetworkEndpoint;
use crate::error::{IpcError, IpcResult};
use crate::rpc::types::{
    parse_address, parse_bool, parse_bytes, parse_hash, parse_string, parse_u256, parse_u64,
    quantity,
};
use crate::rpc::{BlockTag, RpcTransport};

/// How far back a history scan reaches when no start block is given.
pub const DEFAULT_HISTORY_DEPTH: u64 = 100;

/// Block fetches in flight at once during a history scan.
pub const MAX_CONCURRENT_BLOCK_FETCHES: usize = 16;

/// Node client bound to one network endpoint.
#[derive(Clone)]
pub struct EthClient {
    transport: Arc<dyn RpcTransport>,
    endpoint: NetworkEndpoint,
}

impl std::fmt::Debug for EthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthClient")
            .field("network", &self.endpoint.name)
            .field("rpc_url", &self.endpoint.rpc_url)
            .finish()
    }
}

fn addr_param(address: &Address) -> Value {
    json!(address.to_checksum(None))
}

fn typed<T: DeserializeOwned>(method: &str, value: Value) -> IpcResult<T> {
    serde_json::from_value(value).map_err(|e| IpcError::schema(method, e.to_string()))
}

impl EthClient {
    pub fn new(transport: Arc<dyn RpcTransport>, endpoint: NetworkEndpoint) -> Self {
        Self { transport, endpoint }
    }

    pub fn endpoint(&self) -> &NetworkEndpoint {
        &self.endpoint
    }

    /// Raw call; the result is returned unvalidated.
    pub async fn request(&self, method: &str, params: Value) -> IpcResult<Value> {
        self.transport.call(&self.endpoint, method, params).await
    }

    pub async fn client_version(&self) -> IpcResult<String> {
        let method = "web3_clientVersion";
        parse_string(method, &self.request(method, json!([])).await?)
    }

    /// Keccak-256 as computed by the node.
    pub async fn sha3(&self, data: &[u8]) -> IpcResult<B256> {
        let method = "web3_sha3";
        let result = self.request(method, json!([hex::encode_prefixed(data)])).await?;
        parse_hash(method, &result)
    }

    /// Network id, reported by nodes as a decimal string.
    pub async fn net_version(&self) -> IpcResult<String> {
        let method = "net_version";
        parse_string(method, &self.request(method, json!([])).await?)
    }

    pub async fn net_listening(&self) -> IpcResult<bool> {
        let method = "net_listening";
        parse_bool(method, &self.request(method, json!([])).await?)
    }

    pub async fn peer_count(&self) -> IpcResult<u64> {
        let method = "net_peerCount";
        parse_u64(method, &self.request(method, json!([])).await?)
    }

    pub async fn protocol_version(&self) -> IpcResult<String> {
        let method = "eth_protocolVersion";
        parse_string(method, &self.request(method, json!([])).await?)
    }

    /// `None` when the node is not syncing, otherwise its progress object.
    pub async fn syncing(&self) -> IpcResult<Option<Value>> {
        let method = "eth_syncing";
        match self.request(method, json!([])).await? {
            Value::Bool(false) => Ok(None),
            progress @ Value::Object(_) => Ok(Some(progress)),
            other => Err(IpcError::schema(
                method,
                format!("expected false or object, got {other}"),
            )),
        }
    }

    pub async fn coinbase(&self) -> IpcResult<Address> {
        let method = "eth_coinbase";
        parse_address(method, &self.request(method, json!([])).await?)
    }

    pub async fn mining(&self) -> IpcResult<bool> {
        let method = "eth_mining";
        parse_bool(method, &self.request(method, json!([])).await?)
    }

    pub async fn hashrate(&self) -> IpcResult<u64> {
        let method = "eth_hashrate";
        parse_u64(method, &self.request(method, json!([])).await?)
    }

    pub async fn gas_price(&self) -> IpcResult<U256> {
        let method = "eth_gasPrice";
        parse_u256(method, &self.request(method, json!([])).await?)
    }

    /// Accounts held by the node itself.
    pub async fn accounts(&self) -> IpcResult<Vec<Address>> {
        let method = "eth_accounts";
        let result = self.request(method, json!([])).await?;
        let items = result
            .as_array()
            .ok_or_else(|| IpcError::schema(method, format!("expected array, got {result}")))?;
        items.iter().map(|item| parse_address(method, item)).collect()
    }

    pub async fn block_number(&self) -> IpcResult<u64> {
        let method = "eth_blockNumber";
        parse_u64(method, &self.request(method, json!([])).await?)
    }

    pub async fn balance(&self, address: &Address, block: BlockTag) -> IpcResult<U256> {
        let method = "eth_getBalance";
        let result = self
            .request(method, json!([addr_param(address), block.as_param()]))
            .await?;
        parse_u256(method, &result)
    }

    pub async fn storage_at(&self, address: &Address, slot: U256, block: BlockTag) -> IpcResult<B256> {
        let method = "eth_getStorageAt";
        let result = self
            .request(
                method,
                json!([addr_param(address), format!("0x{:x}", slot), block.as_param()]),
            )
            .await?;
        parse_hash(method, &result)
    }

    pub async fn transaction_count(&self, address: &Address, block: BlockTag) -> IpcResult<u64> {
        let method = "eth_getTransactionCount";
        let result = self
            .request(method, json!([addr_param(address), block.as_param()]))
            .await?;
        parse_u64(method, &result)
    }

    pub async fn block_transaction_count_by_hash(&self, hash: &B256) -> IpcResult<u64> {
        let method = "eth_getBlockTransactionCountByHash";
        parse_u64(method, &self.request(method, json!([hash])).await?)
    }

    pub async fn block_transaction_count_by_number(&self, block: BlockTag) -> IpcResult<u64> {
        let method = "eth_getBlockTransactionCountByNumber";
        parse_u64(method, &self.request(method, json!([block.as_param()])).await?)
    }

    pub async fn uncle_count_by_hash(&self, hash: &B256) -> IpcResult<u64> {
        let method = "eth_getUncleCountByBlockHash";
        parse_u64(method, &self.request(method, json!([hash])).await?)
    }

    pub async fn uncle_count_by_number(&self, block: BlockTag) -> IpcResult<u64> {
        let method = "eth_getUncleCountByBlockNumber";
        parse_u64(method, &self.request(method, json!([block.as_param()])).await?)
    }

    pub async fn code(&self, address: &Address, block: BlockTag) -> IpcResult<Bytes> {
        let method = "eth_getCode";
        let result = self
            .request(method, json!([addr_param(address), block.as_param()]))
            .await?;
        parse_bytes(method, &result)
    }

    pub async fn estimate_gas(&self, tx: &Transaction) -> IpcResult<u64> {
        let method = "eth_estimateGas";
        parse_u64(method, &self.request(method, json!([tx.to_rpc_object()])).await?)
    }

    /// Ask the node to sign `data` with one of its own accounts.
    pub async fn sign(&self, address: &Address, data: &[u8]) -> IpcResult<Bytes> {
        let method = "eth_sign";
        let result = self
            .request(method, json!([addr_param(address), hex::encode_prefixed(data)]))
            .await?;
        parse_bytes(method, &result)
    }

    /// `None` while the transaction is unknown or unmined.
    pub async fn transaction_receipt(&self, hash: &B256) -> IpcResult<Option<TransactionReceipt>> {
        let method = "eth_getTransactionReceipt";
        match self.request(method, json!([hash])).await? {
            Value::Null => Ok(None),
            value => typed(method, value).map(Some),
        }
    }

    pub async fn transaction_by_hash(&self, hash: &B256) -> IpcResult<Option<TransactionInfo>> {
        let method = "eth_getTransactionByHash";
        match self.request(method, json!([hash])).await? {
            Value::Null => Ok(None),
            value => typed(method, value).map(Some),
        }
    }

    pub async fn block_by_number(&self, block: BlockTag, full: bool) -> IpcResult<Option<BlockInfo>> {
        let method = "eth_getBlockByNumber";
        match self.request(method, json!([block.as_param(), full])).await? {
            Value::Null => Ok(None),
            value => typed(method, value).map(Some),
        }
    }

    pub async fn block_by_hash(&self, hash: &B256, full: bool) -> IpcResult<Option<BlockInfo>> {
        let method = "eth_getBlockByHash";
        match self.request(method, json!([hash, full])).await? {
            Value::Null => Ok(None),
            value => typed(method, value).map(Some),
        }
    }

    /// Read-only message call.
    pub async fn call(&self, tx: &Transaction, block: BlockTag) -> IpcResult<Bytes> {
        let method = "eth_call";
        let result = self
            .request(method, json!([tx.to_rpc_object(), block.as_param()]))
            .await?;
        parse_bytes(method, &result)
    }

    /// Transactions sent or received by `address` in `[start, latest)`.
    ///
    /// Blocks are fetched concurrently, at most
    /// [`MAX_CONCURRENT_BLOCK_FETCHES`] at a time; any failed fetch fails the
    /// scan. Without a start block, or with block 0, the scan covers the last
    /// [`DEFAULT_HISTORY_DEPTH`] blocks.
    pub async fn transactions_involving(
        &self,
        address: &Address,
        start_block: Option<u64>,
    ) -> IpcResult<Vec<TransactionInfo>> {
        let latest = self.block_number().await?;
        let start = match start_block {
            Some(start) if start > 0 => start,
            _ => latest.saturating_sub(DEFAULT_HISTORY_DEPTH),
        };
        if start >= latest {
            return Ok(Vec::new());
        }

        tracing::debug!(
            network = %self.endpoint.name,
            %address,
            start,
            latest,
            "Scanning block range"
        );

        let blocks: Vec<Option<BlockInfo>> = stream::iter(start..latest)
            .map(|n| self.block_by_number(BlockTag::Number(n), true))
            .buffered(MAX_CONCURRENT_BLOCK_FETCHES)
            .try_collect()
            .await?;

        Ok(blocks
            .iter()
            .flatten()
            .flat_map(BlockInfo::full_transactions)
            .filter(|tx| tx.touches(address))
            .cloned()
            .collect())
    }
}
