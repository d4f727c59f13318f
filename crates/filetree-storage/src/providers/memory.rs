//! In-memory blob store.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_core::types::id::OwnerId;

use crate::keys::blob_key;

/// Blob store keeping every blob in a concurrent map.
#[derive(Debug)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Bytes>,
    namespace: String,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            blobs: DashMap::new(),
            namespace: namespace.into(),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("files")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, owner_id: OwnerId, data: Bytes, original_name: &str) -> AppResult<String> {
        let storage_path = blob_key(&self.namespace, owner_id, original_name);
        self.blobs.insert(storage_path.clone(), data);
        Ok(storage_path)
    }

    async fn get(&self, storage_path: &str) -> AppResult<Bytes> {
        self.blobs
            .get(storage_path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {storage_path}")))
    }

    async fn delete(&self, storage_path: &str) -> AppResult<()> {
        self.blobs
            .remove(storage_path)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {storage_path}")))
    }

    async fn exists(&self, storage_path: &str) -> AppResult<bool> {
        Ok(self.blobs.contains_key(storage_path))
    }
}
