//! Tree node repository.
//!
//! The nested-set indices of an owner's nodes form one shared index space,
//! so every mutation here is serialized per owner and applied atomically:
//! either the index shift and the row changes both land or neither does.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use filetree_core::config::{DatabaseBackend, DatabaseConfig};
use filetree_core::result::AppResult;
use filetree_core::types::id::{NodeId, OwnerId};
use filetree_core::types::pagination::{PageRequest, PageResponse};
use filetree_entity::node::{NewNode, Node, SubtreePlan};

use crate::connection::DatabasePool;

pub use memory::MemoryNodeRepository;
pub use postgres::PgNodeRepository;

/// Durable storage for owner trees.
///
/// Lookups are always scoped by owner: a node belonging to someone else
/// is reported exactly like a missing one.
#[async_trait]
pub trait NodeRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Short backend name ("postgres", "memory").
    fn backend_name(&self) -> &str;

    /// Check whether the backing store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Return the owner's root, creating it the first time.
    ///
    /// Concurrent first calls for one owner all observe the same root.
    async fn resolve_root(&self, owner_id: OwnerId) -> AppResult<Node>;

    /// Find a node by id.
    async fn find_by_id(&self, owner_id: OwnerId, id: NodeId) -> AppResult<Option<Node>>;

    /// Find a non-root node by its materialized path.
    async fn find_by_path(&self, owner_id: OwnerId, path: &str) -> AppResult<Option<Node>>;

    /// One page of direct children: folders first, then newest first.
    async fn list_children(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Node>>;

    /// Every direct child of `parent_id`, in left-index order.
    async fn children(&self, owner_id: OwnerId, parent_id: NodeId) -> AppResult<Vec<Node>>;

    /// Nodes whose interval strictly contains `node`'s, root first.
    async fn ancestors(&self, node: &Node) -> AppResult<Vec<Node>>;

    /// `node` and all of its descendants, in left-index order.
    async fn subtree(&self, node: &Node) -> AppResult<Vec<Node>>;

    /// Every node of the owner's tree, in left-index order.
    async fn all_nodes(&self, owner_id: OwnerId) -> AppResult<Vec<Node>>;

    /// Number of nodes in the owner's tree, root included.
    async fn count(&self, owner_id: OwnerId) -> AppResult<u64>;

    /// Insert `node` as the last child of the folder `parent_id`.
    ///
    /// The new node takes `(parent.rgt, parent.rgt + 1)` after every index
    /// at or beyond `parent.rgt` moves up by two.
    async fn insert_child(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        node: NewNode,
    ) -> AppResult<Node>;

    /// Insert a whole planned forest under `parent_id` in one step.
    ///
    /// Returns the created nodes in plan order.
    async fn insert_subtree(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        plan: &SubtreePlan,
    ) -> AppResult<Vec<Node>>;

    /// Remove `node_id` and its descendants and close the index gap.
    ///
    /// Returns the removed rows in left-index order. The root cannot be
    /// deleted.
    async fn delete_subtree(&self, owner_id: OwnerId, node_id: NodeId) -> AppResult<Vec<Node>>;
}

/// Build the repository selected by `config.backend`.
pub async fn connect_node_repository(config: &DatabaseConfig) -> AppResult<Arc<dyn NodeRepository>> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let pool = DatabasePool::connect(config).await?;
            Ok(Arc::new(PgNodeRepository::new(pool.into_pool())))
        }
        DatabaseBackend::Memory => {
            info!("Using in-memory node repository");
            Ok(Arc::new(MemoryNodeRepository::new()))
        }
    }
}
