//! Root resolution, folder creation, listing, and recursive deletion.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use filetree_core::config::TreeConfig;
use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_core::types::id::NodeId;
use filetree_core::types::pagination::PageRequest;
use filetree_database::NodeRepository;
use filetree_entity::node::{NewNode, Node, NodeResource, NodeTree, SiblingRule, nested_set, path};

use super::requests::{CreateFolderRequest, DeleteNodesRequest, DeleteReport, FolderListing};
use crate::context::RequestContext;

/// Structural operations on owner trees.
#[derive(Debug, Clone)]
pub struct HierarchyService {
    /// Tree node repository.
    nodes: Arc<dyn NodeRepository>,
    /// Blob store, told to forget the bytes of deleted files.
    blobs: Arc<dyn BlobStore>,
    /// Listing settings.
    config: TreeConfig,
}

impl HierarchyService {
    /// Creates a new hierarchy service.
    pub fn new(nodes: Arc<dyn NodeRepository>, blobs: Arc<dyn BlobStore>, config: TreeConfig) -> Self {
        Self {
            nodes,
            blobs,
            config,
        }
    }

    /// The owner's root folder, created on first use.
    pub async fn get_or_create_root(&self, ctx: &RequestContext) -> AppResult<Node> {
        self.nodes.resolve_root(ctx.owner_id).await
    }

    /// Resolve a folder by path, or the root when `path` is absent or empty.
    ///
    /// A path owned by someone else is reported as missing. A path naming a
    /// file is invalid input.
    pub async fn resolve_folder(&self, ctx: &RequestContext, folder_path: Option<&str>) -> AppResult<Node> {
        let Some(normalized) = folder_path.and_then(path::normalize) else {
            return self.get_or_create_root(ctx).await;
        };
        let node = self
            .nodes
            .find_by_path(ctx.owner_id, &normalized)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder '{normalized}' not found")))?;
        if !node.is_folder {
            return Err(AppError::invalid_input(format!(
                "'{normalized}' is a file, not a folder"
            )));
        }
        Ok(node)
    }

    /// Fetch one of the owner's nodes by id.
    pub async fn get_node(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Node> {
        self.nodes
            .find_by_id(ctx.owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))
    }

    /// Create a folder under the folder at `parent_path` (or the root).
    pub async fn create_folder(&self, ctx: &RequestContext, req: CreateFolderRequest) -> AppResult<Node> {
        req.validate()
            .map_err(|e| AppError::invalid_input(format!("Invalid folder name: {e}")))?;

        let parent = self.resolve_folder(ctx, req.parent_path.as_deref()).await?;
        let node = NewNode::folder(req.name).with_sibling_rule(SiblingRule::UniqueFolder);
        let folder = self.insert_node(ctx, &parent, node).await?;
        info!(
            owner_id = %ctx.owner_id,
            folder_id = %folder.id,
            path = %folder.path,
            "Folder created"
        );
        Ok(folder)
    }

    /// Insertion primitive shared by folder creation and imports.
    ///
    /// The node's [`SiblingRule`] is enforced by the repository under the
    /// owner's lock.
    pub async fn insert_node(&self, ctx: &RequestContext, parent: &Node, node: NewNode) -> AppResult<Node> {
        if parent.owner_id != ctx.owner_id {
            return Err(AppError::not_found(format!("Node {} not found", parent.id)));
        }
        self.nodes.insert_child(ctx.owner_id, parent.id, node).await
    }

    /// One page of a folder's children plus its ancestor chain.
    ///
    /// `page` and `page_size` fall back to the first page and the configured
    /// default size; the size is capped at the configured maximum.
    pub async fn list_folder(
        &self,
        ctx: &RequestContext,
        folder_path: Option<&str>,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> AppResult<FolderListing> {
        let folder = self.resolve_folder(ctx, folder_path).await?;
        let page = PageRequest::bounded(
            page.unwrap_or(1),
            page_size.unwrap_or(self.config.default_page_size),
            self.config.max_page_size,
        );

        let items = self
            .nodes
            .list_children(ctx.owner_id, folder.id, &page)
            .await?
            .map(NodeResource::from);
        let mut ancestors: Vec<NodeResource> = self
            .nodes
            .ancestors(&folder)
            .await?
            .into_iter()
            .map(NodeResource::from)
            .collect();
        let folder = NodeResource::from(folder);
        ancestors.push(folder.clone());

        Ok(FolderListing {
            folder,
            items,
            ancestors,
        })
    }

    /// The folder at `folder_path` with every descendant, nested.
    pub async fn folder_tree(&self, ctx: &RequestContext, folder_path: Option<&str>) -> AppResult<NodeTree> {
        let folder = self.resolve_folder(ctx, folder_path).await?;
        let rows = self.nodes.subtree(&folder).await?;
        NodeTree::from_subtree(&rows)
            .ok_or_else(|| AppError::not_found(format!("Node {} not found", folder.id)))
    }

    /// Delete nodes and everything beneath them.
    ///
    /// With `all`, every direct child of the parent folder goes. Otherwise
    /// each listed id must belong to the caller; if any does not, nothing is
    /// deleted. Blob deletion for removed files is best effort: failures are
    /// logged and reported but never undo the metadata removal.
    pub async fn delete_nodes(&self, ctx: &RequestContext, req: DeleteNodesRequest) -> AppResult<DeleteReport> {
        if !req.all && req.ids.is_empty() {
            return Err(AppError::invalid_input(
                "Nothing to delete: pass `all` or at least one id",
            ));
        }

        let parent = self.resolve_folder(ctx, req.parent_path.as_deref()).await?;
        let targets: Vec<NodeId> = if req.all {
            self.nodes
                .children(ctx.owner_id, parent.id)
                .await?
                .into_iter()
                .map(|n| n.id)
                .collect()
        } else {
            let mut seen = HashSet::new();
            let mut targets = Vec::with_capacity(req.ids.len());
            for id in req.ids.iter().copied().filter(|id| seen.insert(*id)) {
                let node = self.get_node(ctx, id).await?;
                if node.is_root() {
                    return Err(AppError::invalid_input("The root folder cannot be deleted"));
                }
                targets.push(id);
            }
            targets
        };

        let mut report = DeleteReport::default();
        for id in targets {
            let removed = match self.nodes.delete_subtree(ctx.owner_id, id).await {
                Ok(removed) => removed,
                Err(e) if e.is_not_found() => {
                    debug!(owner_id = %ctx.owner_id, node_id = %id, "Already removed with an ancestor");
                    continue;
                }
                Err(e) => return Err(e),
            };
            report.deleted.push(id);
            report.removed_nodes += removed.len() as u64;
            self.forget_blobs(&removed, &mut report).await;
        }

        info!(
            owner_id = %ctx.owner_id,
            parent = %parent.path,
            deleted = report.deleted.len(),
            removed_nodes = report.removed_nodes,
            orphaned_blobs = report.orphaned_blobs.len(),
            "Nodes deleted"
        );
        Ok(report)
    }

    async fn forget_blobs(&self, removed: &[Node], report: &mut DeleteReport) {
        for storage_path in removed.iter().filter_map(|n| n.storage_path.as_deref()) {
            match self.blobs.delete(storage_path).await {
                Ok(()) => report.forgotten_blobs += 1,
                Err(e) if e.is_not_found() => {
                    debug!(storage_path, "Blob already absent");
                }
                Err(e) => {
                    warn!(storage_path, error = %e, "Failed to forget blob; leaving it orphaned");
                    report.orphaned_blobs.push(storage_path.to_string());
                }
            }
        }
    }

    /// Check the nested-set invariant over the owner's whole tree and
    /// return its node count.
    pub async fn verify_tree(&self, ctx: &RequestContext) -> AppResult<u64> {
        self.get_or_create_root(ctx).await?;
        let nodes = self.nodes.all_nodes(ctx.owner_id).await?;
        nested_set::verify(&nodes).map_err(|violation| {
            AppError::consistency(format!(
                "Tree of owner {} is corrupt: {violation}",
                ctx.owner_id
            ))
        })?;
        Ok(nodes.len() as u64)
    }

    /// The node repository behind this service.
    pub fn repository(&self) -> &Arc<dyn NodeRepository> {
        &self.nodes
    }
}
