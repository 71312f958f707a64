//! Transaction, receipt and block types.

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::rpc::types::{quantity, quantity_u256, serde_quantity};

/// Hash meaning "no transaction". Waiting on it returns an empty receipt.
pub const ZERO_HASH: B256 = B256::ZERO;

/// A transaction intent, mutable until broadcast.
///
/// `nonce`, `chain_id` and the signature are filled in by the broadcaster
/// right before signing; callers cannot set them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    /// Zero means "use the configured default".
    pub gas_limit: u64,
    /// Zero means "use the configured default".
    pub gas_price: u128,
    nonce: Option<u64>,
    chain_id: Option<u64>,
    signature: Option<Bytes>,
}

impl Transaction {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            to: None,
            value: U256::ZERO,
            data: Bytes::new(),
            gas_limit: 0,
            gas_price: 0,
            nonce: None,
            chain_id: None,
            signature: None,
        }
    }

    /// Plain value transfer.
    pub fn transfer(from: Address, to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Self::new(from)
        }
    }

    pub fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Signed, serialized bytes once the account has signed.
    pub fn signed_bytes(&self) -> Option<&Bytes> {
        self.signature.as_ref()
    }

    pub(crate) fn assign_sequence(&mut self, nonce: u64, chain_id: Option<u64>) {
        self.nonce = Some(nonce);
        self.chain_id = chain_id;
    }

    pub(crate) fn attach_signature(&mut self, signed: Bytes) {
        self.signature = Some(signed);
    }

    /// JSON-RPC transaction object for `eth_call`, `eth_estimateGas` and
    /// `eth_sendTransaction`. Zero fee fields are left for the node to fill.
    pub fn to_rpc_object(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("from".into(), json!(self.from.to_checksum(None)));
        if let Some(to) = self.to {
            obj.insert("to".into(), json!(to.to_checksum(None)));
        }
        if !self.value.is_zero() {
            obj.insert("value".into(), json!(quantity_u256(self.value)));
        }
        if !self.data.is_empty() {
            obj.insert("data".into(), json!(hex::encode_prefixed(&self.data)));
        }
        if self.gas_limit > 0 {
            obj.insert("gas".into(), json!(quantity(self.gas_limit)));
        }
        if self.gas_price > 0 {
            obj.insert("gasPrice".into(), json!(format!("{:#x}", self.gas_price)));
        }
        if let Some(nonce) = self.nonce {
            obj.insert("nonce".into(), json!(quantity(nonce)));
        }
        Value::Object(obj)
    }
}

/// One event log in a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub topics: Vec<B256>,
}

/// Confirmation record for a mined transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    /// Zero until the transaction is in a block.
    #[serde(default, deserialize_with = "serde_quantity::or_zero::deserialize")]
    pub block_number: u64,
    #[serde(default, deserialize_with = "serde_quantity::opt::deserialize")]
    pub status: Option<u64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Receipt standing in for "no transaction was sent".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.block_number == 0
    }

    /// Mined with status 0. Pre-Byzantium receipts carry no status and
    /// never count as reverted.
    pub fn is_reverted(&self) -> bool {
        self.status == Some(0)
    }
}

/// A transaction as returned inside blocks and by `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub hash: B256,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default, deserialize_with = "serde_quantity::opt::deserialize")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "serde_quantity::opt::deserialize")]
    pub nonce: Option<u64>,
}

impl TransactionInfo {
    /// Whether `address` sent or received this transaction.
    pub fn touches(&self, address: &Address) -> bool {
        self.from == *address || self.to.as_ref() == Some(address)
    }
}

/// Block body entry: full object or bare hash depending on the request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BlockTransaction {
    Full(TransactionInfo),
    Hash(B256),
}

/// A block header plus its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    #[serde(default, deserialize_with = "serde_quantity::opt::deserialize")]
    pub number: Option<u64>,
    #[serde(default)]
    pub hash: Option<B256>,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

impl BlockInfo {
    /// Full transaction objects in this block; empty if fetched by hash only.
    pub fn full_transactions(&self) -> impl Iterator<Item = &TransactionInfo> {
        self.transactions.iter().filter_map(|tx| match tx {
            BlockTransaction::Full(info) => Some(info),
            BlockTransaction::Hash(_) => None,
        })
    }
}
