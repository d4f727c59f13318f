//! Service wiring from configuration.

use std::sync::Arc;

use tracing::info;

use filetree_core::config::AppConfig;
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_database::{NodeRepository, connect_node_repository};
use filetree_storage::StorageManager;

use crate::hierarchy::HierarchyService;
use crate::import::ImportService;

/// Every service, built once and shared.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    /// Tree node repository.
    pub nodes: Arc<dyn NodeRepository>,
    /// Blob store.
    pub blobs: Arc<dyn BlobStore>,
    /// Hierarchy engine.
    pub hierarchy: Arc<HierarchyService>,
    /// Tree import engine.
    pub import: Arc<ImportService>,
}

impl ServiceRegistry {
    /// Connect the configured repository and blob store and build the
    /// services on top of them.
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let nodes = connect_node_repository(&config.database).await?;
        let blobs: Arc<dyn BlobStore> = Arc::new(StorageManager::from_config(&config.storage).await?);
        info!(
            repository = nodes.backend_name(),
            blob_store = blobs.provider_type(),
            "Services initialized"
        );
        Ok(Self::from_parts(nodes, blobs, config))
    }

    /// Build the services over an existing repository and blob store.
    pub fn from_parts(nodes: Arc<dyn NodeRepository>, blobs: Arc<dyn BlobStore>, config: &AppConfig) -> Self {
        let hierarchy = Arc::new(HierarchyService::new(
            Arc::clone(&nodes),
            Arc::clone(&blobs),
            config.tree.clone(),
        ));
        let import = Arc::new(ImportService::new(
            Arc::clone(&hierarchy),
            Arc::clone(&blobs),
            config.storage.clone(),
            config.tree.import_mode,
        ));
        Self {
            nodes,
            blobs,
            hierarchy,
            import,
        }
    }
}
