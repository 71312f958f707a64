//! Accounts and key custody.
//!
//! # Security
//! - Private keys live only inside `LocalAccount`; they are never logged
//!   or serialized
//! - Custody backends hand out unlocked accounts as trait objects so flows
//!   never see key material

use std::sync::Arc;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::chain::types::Transaction;
use crate::error::{IpcError, IpcResult};

/// An unlocked account able to sign transactions.
#[async_trait]
pub trait Account: Send + Sync {
    fn address(&self) -> Address;

    /// Uncompressed SEC1 public key, when the backend exposes it.
    fn public_key(&self) -> Option<Bytes>;

    /// Sign a sequenced transaction and return its raw serialized form.
    async fn sign_transaction(&self, tx: &Transaction) -> IpcResult<Bytes>;
}

/// Creates and unlocks accounts.
#[async_trait]
pub trait KeyCustody: Send + Sync {
    async fn create_account(&self) -> IpcResult<Address>;

    async fn unlock(&self, address: &Address) -> IpcResult<Arc<dyn Account>>;
}

/// Account backed by an in-process secp256k1 key.
#[derive(Debug, Clone)]
pub struct LocalAccount {
    signer: PrivateKeySigner,
}

impl LocalAccount {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_private_key(private_key_hex: &str) -> IpcResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| IpcError::Custody(format!("Invalid private key format: {e}")))?;
        Ok(Self { signer })
    }

    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }
}

#[async_trait]
impl Account for LocalAccount {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn public_key(&self) -> Option<Bytes> {
        let point = self.signer.credential().verifying_key().to_encoded_point(false);
        Some(Bytes::copy_from_slice(point.as_bytes()))
    }

    async fn sign_transaction(&self, tx: &Transaction) -> IpcResult<Bytes> {
        let nonce = tx
            .nonce()
            .ok_or_else(|| IpcError::Signing("transaction has no nonce assigned".to_string()))?;

        let mut legacy = TxLegacy {
            chain_id: tx.chain_id(),
            nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: tx.to.map_or(TxKind::Create, TxKind::Call),
            value: tx.value,
            input: tx.data.clone(),
        };

        let signature = self
            .signer
            .sign_transaction_sync(&mut legacy)
            .map_err(|e| IpcError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::from(legacy.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

/// Custody that keeps generated keys in memory for the process lifetime.
#[derive(Debug, Default)]
pub struct InMemoryCustody {
    accounts: DashMap<Address, Arc<LocalAccount>>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import an existing key.
    pub fn insert(&self, account: LocalAccount) -> Address {
        let address = account.address();
        self.accounts.insert(address, Arc::new(account));
        address
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl KeyCustody for InMemoryCustody {
    async fn create_account(&self) -> IpcResult<Address> {
        let address = self.insert(LocalAccount::random());
        tracing::info!(%address, "Account created");
        Ok(address)
    }

    async fn unlock(&self, address: &Address) -> IpcResult<Arc<dyn Account>> {
        self.accounts
            .get(address)
            .map(|account| account.value().clone() as Arc<dyn Account>)
            .ok_or_else(|| IpcError::Custody(format!("no key held for {address}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::U256;

    // Anvil's first development key
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_account_from_private_key() {
        for key in [TEST_PRIVATE_KEY.to_string(), format!("0x{TEST_PRIVATE_KEY}")] {
            let account = LocalAccount::from_private_key(&key).unwrap();
            assert_eq!(account.address().to_string().to_lowercase(), TEST_ADDRESS);
        }
    }

    #[test]
    fn test_invalid_private_key() {
        let err = LocalAccount::from_private_key("invalid_key").unwrap_err();
        assert!(err.to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_public_key_is_uncompressed() {
        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let key = account.public_key().unwrap();
        assert_eq!(key.len(), 65);
        assert_eq!(key[0], 0x04);
    }

    #[tokio::test]
    async fn test_sign_requires_nonce() {
        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let tx = Transaction::new(account.address());
        assert!(matches!(
            account.sign_transaction(&tx).await,
            Err(IpcError::Signing(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_transaction_recovers_sender() {
        let account = LocalAccount::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let mut tx = Transaction::transfer(account.address(), Address::repeat_byte(7), U256::from(5u64));
        tx.gas_limit = 21_000;
        tx.gas_price = 1_000_000_000;
        tx.assign_sequence(3, Some(4));

        let raw = account.sign_transaction(&tx).await.unwrap();
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        let TxEnvelope::Legacy(signed) = envelope else {
            panic!("expected legacy transaction");
        };

        assert_eq!(signed.tx().nonce, 3);
        assert_eq!(signed.tx().chain_id, Some(4));
        assert_eq!(signed.recover_signer().unwrap(), account.address());
    }

    #[tokio::test]
    async fn test_custody_create_and_unlock() {
        let custody = InMemoryCustody::new();
        let address = custody.create_account().await.unwrap();
        assert_eq!(custody.len(), 1);

        let account = custody.unlock(&address).await.unwrap();
        assert_eq!(account.address(), address);

        let missing = custody.unlock(&Address::repeat_byte(9)).await;
        assert!(matches!(missing, Err(IpcError::Custody(_))));
    }
}
