//! Per-account nonce tracking.
//!
//! The cached value is the next nonce to use. Reservations are serialized
//! per account: a [`NonceLease`] holds that account's lock until it is
//! committed or dropped, so two concurrent sends from one account never
//! receive the same nonce.

use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::chain::client::EthClient;
use crate::error::IpcResult;
use crate::rpc::BlockTag;

/// Next-nonce cache keyed by account.
#[derive(Debug, Default)]
pub struct NonceManager {
    nonces: DashMap<Address, u64>,
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached nonce with the node's pending transaction count.
    pub async fn refresh(&self, client: &EthClient, address: Address) -> IpcResult<u64> {
        let count = client.transaction_count(&address, BlockTag::Pending).await?;
        self.nonces.insert(address, count);
        tracing::debug!(%address, nonce = count, "Nonce refreshed");
        Ok(count)
    }

    /// Cached next nonce, if the account has been seen.
    pub fn next(&self, address: &Address) -> Option<u64> {
        self.nonces.get(address).map(|n| *n)
    }

    /// Take the account lock and pick the nonce for one submission.
    ///
    /// The node's pending count is re-read under the lock; the larger of it
    /// and the cache wins, so local sends the node has not yet seen are not
    /// reused and external sends are not collided with.
    pub async fn reserve(&self, client: &EthClient, address: Address) -> IpcResult<NonceLease<'_>> {
        let lock = self.locks.entry(address).or_default().clone();
        let guard = lock.lock_owned().await;

        let node = client.transaction_count(&address, BlockTag::Pending).await?;
        let nonce = self.next(&address).map_or(node, |cached| cached.max(node));

        Ok(NonceLease {
            manager: self,
            address,
            nonce,
            _guard: guard,
        })
    }
}

/// A reserved nonce. Dropping it without `commit` leaves the cache as is.
#[derive(Debug)]
pub struct NonceLease<'a> {
    manager: &'a NonceManager,
    address: Address,
    nonce: u64,
    _guard: OwnedMutexGuard<()>,
}

impl NonceLease<'_> {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Record that `nonce` was accepted by the node.
    pub fn commit(self) {
        self.manager.nonces.insert(self.address, self.nonce + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_endpoint, ScriptedTransport};
    use serde_json::json;

    fn client_with_count(count: &str) -> (Arc<ScriptedTransport>, EthClient) {
        let transport = ScriptedTransport::new();
        transport.respond("eth_getTransactionCount", json!(count));
        let client = EthClient::new(transport.clone(), test_endpoint());
        (transport, client)
    }

    #[tokio::test]
    async fn test_refresh_reads_pending_count() {
        let (transport, client) = client_with_count("0x05");
        let manager = NonceManager::new();
        let address = Address::repeat_byte(0x42);

        assert_eq!(manager.next(&address), None);
        assert_eq!(manager.refresh(&client, address).await.unwrap(), 5);
        assert_eq!(manager.next(&address), Some(5));
        assert_eq!(transport.calls_to("eth_getTransactionCount")[0][1], json!("pending"));
    }

    #[tokio::test]
    async fn test_reserve_prefers_larger_of_node_and_cache() {
        let (_, client) = client_with_count("0x2");
        let manager = NonceManager::new();
        let address = Address::repeat_byte(0x42);

        let lease = manager.reserve(&client, address).await.unwrap();
        assert_eq!(lease.nonce(), 2);
        lease.commit();
        assert_eq!(manager.next(&address), Some(3));

        // node still reports 2; the local send it has not seen wins
        let lease = manager.reserve(&client, address).await.unwrap();
        assert_eq!(lease.nonce(), 3);
    }

    #[tokio::test]
    async fn test_dropped_lease_does_not_advance() {
        let (_, client) = client_with_count("0x7");
        let manager = NonceManager::new();
        let address = Address::repeat_byte(0x42);

        drop(manager.reserve(&client, address).await.unwrap());
        assert_eq!(manager.next(&address), None);
        assert_eq!(manager.reserve(&client, address).await.unwrap().nonce(), 7);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_are_distinct() {
        let (_, client) = client_with_count("0x0");
        let manager = Arc::new(NonceManager::new());
        let address = Address::repeat_byte(0x42);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                let client = client.clone();
                tokio::spawn(async move {
                    let lease = manager.reserve(&client, address).await.unwrap();
                    let nonce = lease.nonce();
                    lease.commit();
                    nonce
                })
            })
            .collect();

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap());
        }
        nonces.sort_unstable();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
    }
}
