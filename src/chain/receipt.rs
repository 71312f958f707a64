//! Receipt polling.
//!
//! # Data Flow
//! ```text
//! wait(hash, cancel)
//!     → zero hash?            → empty receipt, no network call
//!     → zero interval/attempts → InvalidConfig
//!     → tick(interval)        ← or cancel → Cancelled
//!     → eth_getTransactionReceipt
//!         null / blockNumber 0 → keep polling
//!         blockNumber > 0      → receipt
//!     → max_attempts reached  → ReceiptTimeout
//! ```

use std::time::Duration;

use alloy::primitives::B256;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::chain::client::EthClient;
use crate::chain::types::TransactionReceipt;
use crate::config::ReceiptConfig;
use crate::error::{IpcError, IpcResult};
use crate::observability::metrics;

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&ReceiptConfig> for PollPolicy {
    fn from(config: &ReceiptConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl PollPolicy {
    /// Reject a zero interval or a zero attempt budget.
    pub fn validate(&self) -> IpcResult<()> {
        if self.interval.is_zero() {
            return Err(IpcError::InvalidConfig("receipt poll interval must be greater than 0".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(IpcError::InvalidConfig("receipt max attempts must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&ReceiptConfig::default())
    }
}

/// Waits for transactions to be mined.
#[derive(Debug, Clone)]
pub struct ReceiptWaiter {
    client: EthClient,
    policy: PollPolicy,
}

impl ReceiptWaiter {
    pub fn new(client: EthClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    /// Poll until `hash` is in a block, the attempts run out or `cancel`
    /// fires. The first poll happens immediately.
    pub async fn wait(&self, hash: B256, cancel: &CancellationToken) -> IpcResult<TransactionReceipt> {
        if hash.is_zero() {
            return Ok(TransactionReceipt::empty());
        }
        self.policy.validate()?;

        let mut ticker = interval(self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(tx_hash = %hash, attempt, "Receipt polling cancelled");
                    return Err(IpcError::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            match self.client.transaction_receipt(&hash).await? {
                Some(receipt) if !receipt.is_pending() => {
                    metrics::record_receipt_poll("mined");
                    tracing::debug!(
                        tx_hash = %hash,
                        block_number = receipt.block_number,
                        attempt,
                        "Transaction mined"
                    );
                    return Ok(receipt);
                }
                _ => {
                    metrics::record_receipt_poll("pending");
                    tracing::debug!(tx_hash = %hash, attempt, "Transaction pending");
                }
            }
        }

        tracing::warn!(tx_hash = %hash, attempts = self.policy.max_attempts, "Gave up waiting for receipt");
        Err(IpcError::ReceiptTimeout {
            hash,
            attempts: self.policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::ZERO_HASH;
    use crate::test_utils::{test_endpoint, ScriptedTransport};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn waiter(transport: &Arc<ScriptedTransport>, max_attempts: u32) -> ReceiptWaiter {
        let client = EthClient::new(transport.clone(), test_endpoint());
        ReceiptWaiter::new(
            client,
            PollPolicy {
                interval: Duration::from_millis(5),
                max_attempts,
            },
        )
    }

    #[tokio::test]
    async fn test_zero_hash_short_circuits() {
        let transport = ScriptedTransport::new();
        let receipt = waiter(&transport, 3)
            .wait(ZERO_HASH, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt, TransactionReceipt::empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolves_on_third_poll() {
        let transport = ScriptedTransport::new();
        transport.push("eth_getTransactionReceipt", Ok(Value::Null));
        transport.push("eth_getTransactionReceipt", Ok(Value::Null));
        transport.push(
            "eth_getTransactionReceipt",
            Ok(json!({ "blockNumber": "0x3039", "logs": [] })),
        );

        let receipt = waiter(&transport, 10)
            .wait(B256::repeat_byte(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.block_number, 12345);
        assert_eq!(transport.calls_to("eth_getTransactionReceipt").len(), 3);
    }

    #[tokio::test]
    async fn test_pending_receipt_keeps_polling() {
        let transport = ScriptedTransport::new();
        transport.push(
            "eth_getTransactionReceipt",
            Ok(json!({ "blockNumber": null, "logs": [] })),
        );
        transport.push(
            "eth_getTransactionReceipt",
            Ok(json!({ "blockNumber": "0x1", "logs": [] })),
        );

        let receipt = waiter(&transport, 10)
            .wait(B256::repeat_byte(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(receipt.block_number, 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let transport = ScriptedTransport::new();
        transport.respond("eth_getTransactionReceipt", Value::Null);

        let err = waiter(&transport, 3)
            .wait(B256::repeat_byte(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, IpcError::ReceiptTimeout { attempts: 3, .. }));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_poll() {
        let transport = ScriptedTransport::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = waiter(&transport, 3)
            .wait(B256::repeat_byte(1), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, IpcError::Cancelled));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_while_polling() {
        let transport = ScriptedTransport::new();
        transport.respond("eth_getTransactionReceipt", Value::Null);
        let waiter = ReceiptWaiter::new(
            EthClient::new(transport.clone(), test_endpoint()),
            PollPolicy {
                interval: Duration::from_secs(30),
                max_attempts: 10,
            },
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = waiter.wait(B256::repeat_byte(1), &cancel).await.unwrap_err();

        assert!(matches!(err, IpcError::Cancelled));
        assert_eq!(transport.calls_to("eth_getTransactionReceipt").len(), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let transport = ScriptedTransport::new();
        let waiter = ReceiptWaiter::new(
            EthClient::new(transport.clone(), test_endpoint()),
            PollPolicy {
                interval: Duration::ZERO,
                max_attempts: 3,
            },
        );

        let err = waiter
            .wait(B256::repeat_byte(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, IpcError::InvalidConfig(_)));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            max_attempts: 0,
        };
        assert!(matches!(policy.validate(), Err(IpcError::InvalidConfig(_))));
        assert!(PollPolicy::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_rpc_error_stops_polling() {
        let transport = ScriptedTransport::new();
        transport.push(
            "eth_getTransactionReceipt",
            Err(IpcError::Transport("connection refused".to_string())),
        );

        let err = waiter(&transport, 5)
            .wait(B256::repeat_byte(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IpcError::Transport(_)));
        assert_eq!(transport.calls().len(), 1);
    }
}
