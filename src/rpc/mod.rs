//! JSON-RPC plumbing.
//!
//! # Data Flow
//! ```text
//! chain::EthClient (typed method)
//!     → types.rs (request envelope, block tags, quantities)
//!     → transport.rs (HTTPS POST to NetworkEndpoint::rpc_url)
//!     → types.rs (result extraction, error object mapping)
//! ```
//!
//! # Design Decisions
//! - The transport is a trait so flows can run against scripted nodes
//! - Request ids are constant; nothing is pipelined

pub mod transport;
pub mod types;

pub use transport::{HttpTransport, RpcTransport};
pub use types::BlockTag;
