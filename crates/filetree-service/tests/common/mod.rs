//! Shared fixtures for service tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use filetree_core::AppResult;
use filetree_core::config::{AppConfig, ImportMode};
use filetree_core::error::AppError;
use filetree_core::traits::BlobStore;
use filetree_core::types::id::OwnerId;
use filetree_database::{MemoryNodeRepository, NodeRepository};
use filetree_service::{FilePayload, RequestContext, ServiceRegistry};
use filetree_storage::MemoryBlobStore;

/// Services over in-memory backends, plus handles to inspect them.
pub struct Harness {
    pub services: ServiceRegistry,
    pub repo: Arc<MemoryNodeRepository>,
    pub ctx: RequestContext,
}

impl Harness {
    pub fn new() -> (Self, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::default());
        (Self::with_blobs(blobs.clone(), AppConfig::default()), blobs)
    }

    pub fn with_blobs(blobs: Arc<dyn BlobStore>, config: AppConfig) -> Self {
        let repo = Arc::new(MemoryNodeRepository::new());
        let nodes: Arc<dyn NodeRepository> = repo.clone();
        Self {
            services: ServiceRegistry::from_parts(nodes, blobs, &config),
            repo,
            ctx: RequestContext::new(OwnerId::new()),
        }
    }

    pub fn other_owner(&self) -> RequestContext {
        RequestContext::new(OwnerId::new())
    }

    pub async fn count(&self) -> u64 {
        self.repo.count(self.ctx.owner_id).await.unwrap()
    }

    pub async fn assert_consistent(&self) {
        self.services.hierarchy.verify_tree(&self.ctx).await.unwrap();
    }
}

pub fn text_file(name: &str, body: &'static str) -> FilePayload {
    FilePayload::new(name, Bytes::from_static(body.as_bytes()))
}

pub fn config_with_mode(mode: ImportMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.tree.import_mode = mode;
    config
}

/// Blob store that fails `put` after a number of successes and can be told
/// to fail every `delete`, or to cancel a token on a given `put`.
#[derive(Debug)]
pub struct FlakyBlobStore {
    inner: MemoryBlobStore,
    puts: AtomicUsize,
    fail_put_after: Option<usize>,
    fail_deletes: bool,
    cancel_on_put: Option<(usize, CancellationToken)>,
}

impl FlakyBlobStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::default(),
            puts: AtomicUsize::new(0),
            fail_put_after: None,
            fail_deletes: false,
            cancel_on_put: None,
        }
    }

    pub fn failing_put_after(mut self, successes: usize) -> Self {
        self.fail_put_after = Some(successes);
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn cancelling_on_put(mut self, nth: usize, token: CancellationToken) -> Self {
        self.cancel_on_put = Some((nth, token));
        self
    }

    pub fn stored(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    fn provider_type(&self) -> &str {
        "flaky"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, owner_id: OwnerId, data: Bytes, original_name: &str) -> AppResult<String> {
        let attempt = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((nth, token)) = &self.cancel_on_put {
            if attempt == *nth {
                token.cancel();
            }
        }
        if self.fail_put_after.is_some_and(|limit| attempt > limit) {
            return Err(AppError::storage("disk unavailable"));
        }
        self.inner.put(owner_id, data, original_name).await
    }

    async fn get(&self, storage_path: &str) -> AppResult<Bytes> {
        self.inner.get(storage_path).await
    }

    async fn delete(&self, storage_path: &str) -> AppResult<()> {
        if self.fail_deletes {
            return Err(AppError::storage("blob backend timed out"));
        }
        self.inner.delete(storage_path).await
    }

    async fn exists(&self, storage_path: &str) -> AppResult<bool> {
        self.inner.exists(storage_path).await
    }
}
