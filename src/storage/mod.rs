//! Content-addressed storage.
//!
//! Profiles and images are stored by the hash of their bytes. The hash is a
//! sha2-256 multihash; its base58 form is what content nodes use, and its
//! bare 32-byte digest is what the on-chain registry holds.
//!
//! ```text
//! bytes → sha256 → 0x12 0x20 ‖ digest (multihash) → base58 ("Qm...")
//!                                    └─ digest → registry value (bytes32)
//! ```

pub mod hash;
pub mod memory;

use async_trait::async_trait;

use crate::error::IpcResult;

pub use hash::ContentHash;
pub use memory::MemoryContentStore;

/// A content-addressed blob store such as an IPFS node.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> IpcResult<ContentHash>;

    async fn get(&self, hash: &ContentHash) -> IpcResult<Vec<u8>>;
}
