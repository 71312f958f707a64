//! In-process content store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{IpcError, IpcResult};
use crate::storage::{ContentHash, ContentStore};

/// Keeps blobs in memory. Useful for tests and offline flows.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: DashMap<ContentHash, Vec<u8>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> IpcResult<ContentHash> {
        let hash = ContentHash::of(&bytes);
        self.blobs.insert(hash, bytes);
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> IpcResult<Vec<u8>> {
        self.blobs
            .get(hash)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| IpcError::ContentStore(format!("{hash} not found")))
    }
}
