//! Tree import engine.
//!
//! Builds a whole nested folder/file structure under one parent folder.
//! In [`ImportMode::Atomic`] every blob is stored first and the complete
//! subtree is then inserted in a single repository operation, so a failed
//! or cancelled import leaves no nodes behind. [`ImportMode::Incremental`]
//! inserts node by node and stops at the first failure, keeping what was
//! already committed.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use filetree_core::config::{ImportMode, StorageConfig};
use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_entity::node::{NewNode, Node, NodeResource, SiblingRule, SubtreePlan};

use super::tree::{FilePayload, TreeDescription, TreeEntry};
use crate::context::RequestContext;
use crate::hierarchy::HierarchyService;

/// How to run one import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Commit strategy.
    pub mode: ImportMode,
    /// Stops the import when cancelled.
    pub cancel: CancellationToken,
}

impl ImportOptions {
    /// Options for the given mode with a fresh cancellation token.
    pub fn new(mode: ImportMode) -> Self {
        Self {
            mode,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to stop the import.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What an import created.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Commit strategy that was used.
    pub mode: ImportMode,
    /// The folder the tree was imported into.
    pub parent: NodeResource,
    /// Created nodes, parents before children.
    pub created: Vec<NodeResource>,
    /// Number of folders created.
    pub folders: u64,
    /// Number of files created.
    pub files: u64,
    /// Total bytes stored.
    pub bytes: u64,
}

impl ImportReport {
    fn new(mode: ImportMode, parent: &Node, created: Vec<Node>) -> Self {
        let folders = created.iter().filter(|n| n.is_folder).count() as u64;
        let bytes = created
            .iter()
            .filter_map(|n| n.size_bytes)
            .map(|size| size.max(0) as u64)
            .sum();
        Self {
            mode,
            parent: NodeResource::from(parent),
            files: created.len() as u64 - folders,
            folders,
            bytes,
            created: created.into_iter().map(NodeResource::from).collect(),
        }
    }
}

/// Uploads whole directory trees or flat lists of files.
#[derive(Debug, Clone)]
pub struct ImportService {
    /// Hierarchy engine used for parent resolution and insertion.
    hierarchy: Arc<HierarchyService>,
    /// Blob store receiving file content.
    blobs: Arc<dyn BlobStore>,
    /// Upload limits.
    storage: StorageConfig,
    /// Mode used by [`default_options`](Self::default_options).
    default_mode: ImportMode,
}

impl ImportService {
    /// Creates a new import service.
    pub fn new(
        hierarchy: Arc<HierarchyService>,
        blobs: Arc<dyn BlobStore>,
        storage: StorageConfig,
        default_mode: ImportMode,
    ) -> Self {
        Self {
            hierarchy,
            blobs,
            storage,
            default_mode,
        }
    }

    /// Options using the configured default mode.
    pub fn default_options(&self) -> ImportOptions {
        ImportOptions::new(self.default_mode)
    }

    /// Store a flat list of files under the folder at `parent_path`.
    pub async fn save_files(
        &self,
        ctx: &RequestContext,
        parent_path: Option<&str>,
        files: Vec<FilePayload>,
        options: ImportOptions,
    ) -> AppResult<ImportReport> {
        let tree = files
            .into_iter()
            .fold(TreeDescription::new(), TreeDescription::with_file);
        self.import_tree(ctx, parent_path, tree, options).await
    }

    /// Import `tree` under the folder at `parent_path` (or the root).
    pub async fn import_tree(
        &self,
        ctx: &RequestContext,
        parent_path: Option<&str>,
        tree: TreeDescription,
        options: ImportOptions,
    ) -> AppResult<ImportReport> {
        if tree.is_empty() {
            return Err(AppError::invalid_input("Empty upload: nothing to import"));
        }
        tree.validate()?;
        let stats = tree.stats();
        if stats.largest_file > self.storage.max_upload_size_bytes {
            return Err(AppError::invalid_input(format!(
                "File exceeds maximum upload size of {} bytes",
                self.storage.max_upload_size_bytes
            )));
        }

        let parent = self.hierarchy.resolve_folder(ctx, parent_path).await?;
        self.check_collisions(ctx, &parent, &tree).await?;

        let created = match options.mode {
            ImportMode::Atomic => self.import_atomic(ctx, &parent, tree, &options.cancel).await?,
            ImportMode::Incremental => {
                self.import_incremental(ctx, &parent, tree, &options.cancel)
                    .await?
            }
        };

        let report = ImportReport::new(options.mode, &parent, created);
        info!(
            owner_id = %ctx.owner_id,
            parent = %parent.path,
            mode = ?report.mode,
            folders = report.folders,
            files = report.files,
            bytes = report.bytes,
            "Tree imported"
        );
        Ok(report)
    }

    async fn check_collisions(&self, ctx: &RequestContext, parent: &Node, tree: &TreeDescription) -> AppResult<()> {
        let existing: HashSet<String> = self
            .hierarchy
            .repository()
            .children(ctx.owner_id, parent.id)
            .await?
            .into_iter()
            .map(|n| n.name)
            .collect();
        if let Some(name) = tree.top_level_names().find(|name| existing.contains(*name)) {
            return Err(AppError::invalid_input(format!(
                "'{name}' already exists in the target folder"
            )));
        }
        Ok(())
    }

    async fn import_atomic(
        &self,
        ctx: &RequestContext,
        parent: &Node,
        tree: TreeDescription,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Node>> {
        let mut stored: Vec<String> = Vec::new();
        let result = self.plan_and_insert(ctx, parent, tree, cancel, &mut stored).await;
        if result.is_err() {
            self.discard_blobs(&stored).await;
        }
        result
    }

    async fn plan_and_insert(
        &self,
        ctx: &RequestContext,
        parent: &Node,
        tree: TreeDescription,
        cancel: &CancellationToken,
        stored: &mut Vec<String>,
    ) -> AppResult<Vec<Node>> {
        let mut builder = SubtreePlan::builder();
        let mut pending: Vec<(Option<usize>, std::vec::IntoIter<(String, TreeEntry)>)> =
            vec![(None, tree.into_entries().into_iter())];

        while let Some((under, mut entries)) = pending.pop() {
            let Some((name, entry)) = entries.next() else {
                continue;
            };
            pending.push((under, entries));
            if cancel.is_cancelled() {
                warn!(owner_id = %ctx.owner_id, "Import cancelled before commit; nothing kept");
                return Err(AppError::cancelled("Import cancelled"));
            }
            match entry {
                TreeEntry::Folder(children) => {
                    let index = builder.push(under, imported_folder(name))?;
                    pending.push((Some(index), children.into_entries().into_iter()));
                }
                TreeEntry::File(payload) => {
                    let node = self.store_payload(ctx, payload).await?;
                    if let Some(storage_path) = &node.storage_path {
                        stored.push(storage_path.clone());
                    }
                    builder.push(under, node)?;
                }
            }
        }

        if cancel.is_cancelled() {
            warn!(owner_id = %ctx.owner_id, "Import cancelled before commit; nothing kept");
            return Err(AppError::cancelled("Import cancelled"));
        }
        self.hierarchy
            .repository()
            .insert_subtree(ctx.owner_id, parent.id, &builder.build())
            .await
    }

    async fn import_incremental(
        &self,
        ctx: &RequestContext,
        parent: &Node,
        tree: TreeDescription,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Node>> {
        let mut created: Vec<Node> = Vec::new();
        let mut pending: Vec<(Node, std::vec::IntoIter<(String, TreeEntry)>)> =
            vec![(parent.clone(), tree.into_entries().into_iter())];

        while let Some((under, mut entries)) = pending.pop() {
            let Some((name, entry)) = entries.next() else {
                continue;
            };
            let current = under.clone();
            pending.push((under, entries));
            if cancel.is_cancelled() {
                warn!(
                    owner_id = %ctx.owner_id,
                    committed = created.len(),
                    "Import cancelled; committed nodes are kept"
                );
                return Err(AppError::cancelled(format!(
                    "Import cancelled after {} node(s) were created",
                    created.len()
                )));
            }

            let outcome = match entry {
                TreeEntry::Folder(children) => {
                    match self.hierarchy.insert_node(ctx, &current, imported_folder(name)).await {
                        Ok(folder) => {
                            pending.push((folder.clone(), children.into_entries().into_iter()));
                            Ok(folder)
                        }
                        Err(e) => Err(e),
                    }
                }
                TreeEntry::File(payload) => self.insert_file(ctx, &current, payload).await,
            };

            match outcome {
                Ok(node) => created.push(node),
                Err(e) => {
                    warn!(
                        owner_id = %ctx.owner_id,
                        committed = created.len(),
                        error = %e,
                        "Import aborted; tree is partially imported"
                    );
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    async fn insert_file(&self, ctx: &RequestContext, parent: &Node, payload: FilePayload) -> AppResult<Node> {
        let node = self.store_payload(ctx, payload).await?;
        let storage_path = node.storage_path.clone();
        match self.hierarchy.insert_node(ctx, parent, node).await {
            Ok(inserted) => Ok(inserted),
            Err(e) => {
                if let Some(storage_path) = storage_path {
                    self.discard_blobs(&[storage_path]).await;
                }
                Err(e)
            }
        }
    }

    /// Put the payload's bytes and describe the file node recording them.
    async fn store_payload(&self, ctx: &RequestContext, payload: FilePayload) -> AppResult<NewNode> {
        let size = payload.data.len() as i64;
        let storage_path = self
            .blobs
            .put(ctx.owner_id, payload.data, &payload.name)
            .await?;
        Ok(NewNode::file(payload.name, storage_path, payload.mime, size)
            .with_sibling_rule(SiblingRule::Unique))
    }

    async fn discard_blobs(&self, storage_paths: &[String]) {
        for storage_path in storage_paths {
            if let Err(e) = self.blobs.delete(storage_path).await {
                warn!(storage_path, error = %e, "Failed to clean up blob of aborted import");
            }
        }
    }
}

/// Imported names must not collide with any sibling, file or folder.
fn imported_folder(name: String) -> NewNode {
    NewNode::folder(name).with_sibling_rule(SiblingRule::Unique)
}
