//! Transaction lifecycle against an Ethereum node.
//!
//! # Data Flow
//! ```text
//! builder.rs (contract interface + args → Transaction)
//!     → broadcaster.rs
//!         node custody:  eth_sendTransaction
//!         local custody: nonce.rs (reserve) → account.rs (sign) → eth_sendRawTransaction
//!     → receipt.rs (poll eth_getTransactionReceipt until mined)
//!     → logs.rs (addresses out of the receipt's logs)
//! ```
//!
//! # Design Decisions
//! - `client.rs` owns every node method and its result-shape checks
//! - Nonce reservation holds a per-account lock from the node query until
//!   the node accepts the transaction
//! - Key material stays behind the `Account` trait

pub mod account;
pub mod broadcaster;
pub mod builder;
pub mod client;
pub mod logs;
pub mod nonce;
pub mod receipt;
pub mod types;

pub use account::{Account, InMemoryCustody, KeyCustody, LocalAccount};
pub use broadcaster::TransactionBroadcaster;
pub use builder::{ContractInterface, ContractStore, TransactionBuilder};
pub use client::EthClient;
pub use logs::LogField;
pub use nonce::{NonceLease, NonceManager};
pub use receipt::{PollPolicy, ReceiptWaiter};
pub use types::{Log, Transaction, TransactionInfo, TransactionReceipt, ZERO_HASH};
