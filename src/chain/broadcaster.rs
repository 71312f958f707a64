//! Transaction submission.
//!
//! Two custody modes:
//! - node custody: the node holds the key, `eth_sendTransaction` unsigned
//! - local custody: fees defaulted, nonce and chain id assigned under the
//!   account's nonce lock, signed by the `Account`, `eth_sendRawTransaction`

use std::sync::Arc;

use alloy::primitives::{hex, B256};
use serde_json::json;

use crate::chain::account::Account;
use crate::chain::client::EthClient;
use crate::chain::nonce::NonceManager;
use crate::chain::types::Transaction;
use crate::config::TransactionDefaults;
use crate::error::{IpcError, IpcResult};
use crate::observability::metrics;
use crate::rpc::types::parse_hash;

/// Signs (or delegates signing) and submits transactions to one network.
#[derive(Debug, Clone)]
pub struct TransactionBroadcaster {
    client: EthClient,
    nonces: Arc<NonceManager>,
    defaults: TransactionDefaults,
}

impl TransactionBroadcaster {
    pub fn new(client: EthClient, nonces: Arc<NonceManager>, defaults: TransactionDefaults) -> Self {
        Self {
            client,
            nonces,
            defaults,
        }
    }

    pub fn client(&self) -> &EthClient {
        &self.client
    }

    /// Submit through the node's own key.
    pub async fn send_transaction(&self, tx: &Transaction) -> IpcResult<B256> {
        let method = "eth_sendTransaction";
        let result = self.client.request(method, json!([tx.to_rpc_object()])).await?;
        let hash = parse_hash(method, &result)?;

        metrics::record_broadcast("node");
        tracing::info!(
            network = %self.client.endpoint().name,
            from = %tx.from,
            tx_hash = %hash,
            "Transaction submitted (node custody)"
        );
        Ok(hash)
    }

    /// Sequence, sign locally and submit.
    ///
    /// The nonce is only advanced once the node has accepted the
    /// transaction and returned a well-formed hash.
    pub async fn send_raw_transaction(&self, account: &dyn Account, tx: &mut Transaction) -> IpcResult<B256> {
        if tx.from != account.address() {
            return Err(IpcError::Signing(format!(
                "transaction is from {} but account is {}",
                tx.from,
                account.address()
            )));
        }

        if tx.gas_limit == 0 {
            tx.gas_limit = self.defaults.default_gas_limit;
        }
        if tx.gas_price == 0 {
            tx.gas_price = self.defaults.default_gas_price_wei;
        }

        let lease = self.nonces.reserve(&self.client, tx.from).await?;
        tx.assign_sequence(lease.nonce(), self.client.endpoint().chain_id);

        let raw = account.sign_transaction(tx).await?;
        tx.attach_signature(raw.clone());

        let method = "eth_sendRawTransaction";
        let result = self
            .client
            .request(method, json!([hex::encode_prefixed(&raw)]))
            .await?;
        let hash = parse_hash(method, &result)?;
        lease.commit();

        metrics::record_broadcast("local");
        tracing::info!(
            network = %self.client.endpoint().name,
            from = %tx.from,
            nonce = tx.nonce().unwrap_or_default(),
            tx_hash = %hash,
            "Transaction submitted (local custody)"
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::account::LocalAccount;
    use crate::test_utils::{test_endpoint, ScriptedTransport};
    use alloy::primitives::{Address, U256};
    use serde_json::Value;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn broadcaster(transport: &Arc<ScriptedTransport>) -> (TransactionBroadcaster, Arc<NonceManager>) {
        let nonces = Arc::new(NonceManager::new());
        let client = EthClient::new(transport.clone(), test_endpoint());
        (
            TransactionBroadcaster::new(client, nonces.clone(), TransactionDefaults::default()),
            nonces,
        )
    }

    fn hash_json(byte: u8) -> Value {
        json!(format!("0x{}", format!("{byte:02x}").repeat(32)))
    }

    #[tokio::test]
    async fn test_raw_send_sequences_and_signs() {
        let transport = ScriptedTransport::new();
        transport.respond("eth_getTransactionCount", json!("0x5"));
        transport.respond("eth_sendRawTransaction", hash_json(0xab));
        let (broadcaster, nonces) = broadcaster(&transport);

        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let mut tx = Transaction::transfer(account.address(), Address::repeat_byte(2), U256::from(1u64));

        let hash = broadcaster.send_raw_transaction(&account, &mut tx).await.unwrap();

        assert_eq!(hash, B256::repeat_byte(0xab));
        assert_eq!(tx.nonce(), Some(5));
        assert_eq!(tx.chain_id(), Some(0xff));
        assert_eq!(tx.gas_limit, 350_000);
        assert_eq!(tx.gas_price, 20_000_000_000);
        assert_eq!(nonces.next(&account.address()), Some(6));

        let sent = transport.calls_to("eth_sendRawTransaction");
        let raw = tx.signed_bytes().unwrap();
        assert_eq!(sent[0][0], json!(hex::encode_prefixed(raw)));
    }

    #[tokio::test]
    async fn test_back_to_back_sends_use_distinct_nonces() {
        let transport = ScriptedTransport::new();
        transport.respond("eth_getTransactionCount", json!("0x0"));
        transport.respond("eth_sendRawTransaction", hash_json(1));
        let (broadcaster, _) = broadcaster(&transport);
        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();

        let mut first = Transaction::new(account.address());
        let mut second = Transaction::new(account.address());
        broadcaster.send_raw_transaction(&account, &mut first).await.unwrap();
        broadcaster.send_raw_transaction(&account, &mut second).await.unwrap();

        assert_eq!(first.nonce(), Some(0));
        assert_eq!(second.nonce(), Some(1));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_schema_error_and_keeps_nonce() {
        let transport = ScriptedTransport::new();
        transport.respond("eth_getTransactionCount", json!("0x3"));
        transport.respond("eth_sendRawTransaction", json!("0x1234"));
        let (broadcaster, nonces) = broadcaster(&transport);
        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();

        let mut tx = Transaction::new(account.address());
        let err = broadcaster.send_raw_transaction(&account, &mut tx).await.unwrap_err();

        assert!(matches!(err, IpcError::Schema { .. }));
        assert_eq!(nonces.next(&account.address()), None);
    }

    #[tokio::test]
    async fn test_node_error_surfaces_as_rpc_error() {
        let transport = ScriptedTransport::new();
        transport.push(
            "eth_sendTransaction",
            Err(IpcError::Rpc {
                code: -32000,
                message: "unknown account".to_string(),
            }),
        );
        let (broadcaster, _) = broadcaster(&transport);

        let err = broadcaster
            .send_transaction(&Transaction::new(Address::repeat_byte(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, IpcError::Rpc { code: -32000, .. }));
    }

    #[tokio::test]
    async fn test_node_custody_sends_unsigned_object() {
        let transport = ScriptedTransport::new();
        transport.respond("eth_sendTransaction", hash_json(7));
        let (broadcaster, _) = broadcaster(&transport);

        let from = Address::repeat_byte(1);
        let hash = broadcaster.send_transaction(&Transaction::new(from)).await.unwrap();

        assert_eq!(hash, B256::repeat_byte(7));
        let params = transport.calls_to("eth_sendTransaction");
        assert_eq!(params[0][0]["from"], json!(from.to_checksum(None)));
        assert!(params[0][0].get("nonce").is_none());
    }

    #[tokio::test]
    async fn test_account_mismatch_is_rejected() {
        let transport = ScriptedTransport::new();
        let (broadcaster, _) = broadcaster(&transport);
        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();

        let mut tx = Transaction::new(Address::repeat_byte(9));
        let err = broadcaster.send_raw_transaction(&account, &mut tx).await.unwrap_err();
        assert!(matches!(err, IpcError::Signing(_)));
        assert!(transport.calls().is_empty());
    }
}
