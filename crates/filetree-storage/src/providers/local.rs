//! Local filesystem blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use filetree_core::error::{AppError, ErrorKind};
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_core::types::id::OwnerId;

use crate::keys::{blob_key, validate_key};

/// Blob store writing each blob to a file under a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// Leading key segment for new blobs.
    namespace: String,
}

impl LocalBlobStore {
    /// Create a new local blob store rooted at the given path.
    pub async fn new(root_path: impl AsRef<Path>, namespace: impl Into<String>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            namespace: namespace.into(),
        })
    }

    /// Resolve a storage path to an absolute path within the root.
    fn resolve(&self, storage_path: &str) -> AppResult<PathBuf> {
        validate_key(storage_path)?;
        Ok(self.root.join(storage_path))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

fn io_error(action: &str, storage_path: &str, err: std::io::Error) -> AppError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Blob not found: {storage_path}"))
    } else {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to {action} blob: {storage_path}"),
            err,
        )
    }
}

/// Write `data` to a `.part` sibling of `target` and rename it into place,
/// so a crash never leaves a truncated blob at `target`. The `.part` file is
/// removed again when any step fails.
async fn write_atomically(target: &Path, data: &[u8]) -> Result<(), (&'static str, std::io::Error)> {
    let partial = target.with_extension("part");
    let result: Result<(), (&'static str, std::io::Error)> = async {
        let mut file = fs::File::create(&partial).await.map_err(|e| ("create", e))?;
        file.write_all(data).await.map_err(|e| ("write", e))?;
        file.sync_all().await.map_err(|e| ("sync", e))?;
        drop(file);
        fs::rename(&partial, target).await.map_err(|e| ("commit", e))
    }
    .await;

    if result.is_err() {
        if let Err(e) = fs::remove_file(&partial).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %e, "Failed to remove partial blob");
            }
        }
    }
    result
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    async fn put(&self, owner_id: OwnerId, data: Bytes, original_name: &str) -> AppResult<String> {
        let storage_path = blob_key(&self.namespace, owner_id, original_name);
        let full_path = self.resolve(&storage_path)?;
        self.ensure_parent(&full_path).await?;

        write_atomically(&full_path, &data)
            .await
            .map_err(|(action, e)| io_error(action, &storage_path, e))?;

        debug!(%owner_id, storage_path, bytes = data.len(), "Stored blob");
        Ok(storage_path)
    }

    async fn get(&self, storage_path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(storage_path)?;
        let data = fs::read(&full_path)
            .await
            .map_err(|e| io_error("read", storage_path, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, storage_path: &str) -> AppResult<()> {
        let full_path = self.resolve(storage_path)?;
        fs::remove_file(&full_path)
            .await
            .map_err(|e| io_error("delete", storage_path, e))?;
        debug!(storage_path, "Deleted blob");
        Ok(())
    }

    async fn exists(&self, storage_path: &str) -> AppResult<bool> {
        let full_path = self.resolve(storage_path)?;
        fs::try_exists(&full_path)
            .await
            .map_err(|e| io_error("inspect", storage_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "files").await.unwrap();
        let owner = OwnerId::new();

        let data = Bytes::from("hello world");
        let key = store.put(owner, data.clone(), "hello.txt").await.unwrap();
        assert!(key.starts_with(&format!("files/{owner}/")));
        assert!(store.exists(&key).await.unwrap());
        assert!(dir.path().join(&key).is_file());

        let read_back = store.get(&key).await.unwrap();
        assert_eq!(read_back, data);

        store.delete(&key).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "files").await.unwrap();

        let err = store.delete("files/nobody/missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
        let err = store.get("files/nobody/missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "files").await.unwrap();
        let err = store.get("../outside").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("blob.bin");
        fs::create_dir_all(target.join("occupied")).await.unwrap();

        let (action, _) = write_atomically(&target, b"payload").await.unwrap_err();
        assert_eq!(action, "commit");
        assert!(!dir.path().join("blob.part").exists());
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("nested"), "files")
            .await
            .unwrap();
        assert!(store.health_check().await.unwrap());
    }
}
