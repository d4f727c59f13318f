//! Storage manager: selects the configured blob store and delegates to it.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use filetree_core::config::StorageConfig;
use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_core::types::id::OwnerId;

use crate::providers::{LocalBlobStore, MemoryBlobStore};

/// The blob store chosen by `storage.provider`.
#[derive(Debug, Clone)]
pub struct StorageManager {
    provider: Arc<dyn BlobStore>,
}

impl StorageManager {
    /// Build the provider named in the configuration.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let provider: Arc<dyn BlobStore> = match config.provider.as_str() {
            "local" => {
                info!(root = %config.local.root_path, "Using local blob store");
                Arc::new(LocalBlobStore::new(&config.local.root_path, config.namespace.clone()).await?)
            }
            "memory" => {
                info!("Using in-memory blob store");
                Arc::new(MemoryBlobStore::new(config.namespace.clone()))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider '{other}' (expected 'local' or 'memory')"
                )));
            }
        };
        Ok(Self { provider })
    }

    /// Wrap an already constructed provider.
    pub fn with_provider(provider: Arc<dyn BlobStore>) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    pub fn provider(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.provider)
    }
}

#[async_trait]
impl BlobStore for StorageManager {
    fn provider_type(&self) -> &str {
        self.provider.provider_type()
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }

    async fn put(&self, owner_id: OwnerId, data: Bytes, original_name: &str) -> AppResult<String> {
        self.provider.put(owner_id, data, original_name).await
    }

    async fn get(&self, storage_path: &str) -> AppResult<Bytes> {
        self.provider.get(storage_path).await
    }

    async fn delete(&self, storage_path: &str) -> AppResult<()> {
        self.provider.delete(storage_path).await
    }

    async fn exists(&self, storage_path: &str) -> AppResult<bool> {
        self.provider.exists(storage_path).await
    }
}
