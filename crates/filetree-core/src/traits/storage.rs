//! Blob store trait for the byte storage behind file nodes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::types::id::OwnerId;

/// Trait for opaque byte storage keyed by storage paths.
///
/// The hierarchy engine only records and forgets storage paths; it never
/// reads file content itself. Implementations live in `filetree-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the store is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Persist `data` under a namespace keyed by `owner_id` and return the
    /// storage path that addresses it.
    ///
    /// The store is assumed durable once this returns.
    async fn put(&self, owner_id: OwnerId, data: Bytes, original_name: &str) -> AppResult<String>;

    /// Fetch the bytes stored at `storage_path`.
    async fn get(&self, storage_path: &str) -> AppResult<Bytes>;

    /// Delete the blob at `storage_path`.
    ///
    /// Returns a `NotFound` error when nothing is stored there.
    async fn delete(&self, storage_path: &str) -> AppResult<()>;

    /// Check whether a blob exists at `storage_path`.
    async fn exists(&self, storage_path: &str) -> AppResult<bool>;
}
