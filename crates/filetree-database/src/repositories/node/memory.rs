//! In-memory node repository.
//!
//! Each owner's tree sits behind its own `tokio::sync::RwLock`, so writers
//! for one owner are serialized while readers and other owners proceed.
//! Every mutation validates its inputs before touching any node, which
//! makes inserts and deletes all-or-nothing without a rollback log.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;

use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::types::id::{NodeId, OwnerId};
use filetree_core::types::pagination::{PageRequest, PageResponse};
use filetree_entity::node::nested_set::{
    ROOT_LFT, ROOT_RGT, insertion_slot, shift_for_delete, shift_for_insert,
};
use filetree_entity::node::{NewNode, Node, SubtreePlan, path};

use super::NodeRepository;

/// One owner's nodes and the paths already in use.
#[derive(Debug)]
struct OwnerTree {
    root_id: NodeId,
    nodes: HashMap<NodeId, Node>,
    paths: HashSet<String>,
}

impl OwnerTree {
    fn new(owner_id: OwnerId) -> Self {
        let now = Utc::now();
        let root = Node {
            id: NodeId::new(),
            owner_id,
            parent_id: None,
            name: owner_id.to_string(),
            is_folder: true,
            path: String::new(),
            lft: ROOT_LFT,
            rgt: ROOT_RGT,
            storage_path: None,
            mime: None,
            size_bytes: None,
            created_at: now,
            updated_at: now,
        };
        let root_id = root.id;
        Self {
            root_id,
            nodes: HashMap::from([(root_id, root)]),
            paths: HashSet::new(),
        }
    }

    fn root(&self) -> AppResult<&Node> {
        self.nodes
            .get(&self.root_id)
            .ok_or_else(|| AppError::internal("Owner tree lost its root"))
    }

    fn folder(&self, id: NodeId) -> AppResult<&Node> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?;
        if !node.is_folder {
            return Err(AppError::invalid_input(format!(
                "'{}' is a file and cannot hold children",
                node.name
            )));
        }
        Ok(node)
    }

    fn check_sibling_name(&self, parent_id: NodeId, node: &NewNode) -> AppResult<()> {
        let taken = self.nodes.values().any(|n| {
            n.parent_id == Some(parent_id)
                && n.name == node.name
                && node.sibling_rule.blocked_by(n.is_folder)
        });
        if taken {
            return Err(node.name_taken());
        }
        Ok(())
    }

    fn claim_path(&mut self, base: &str) -> String {
        let path = path::unique_path(base, |candidate| self.paths.contains(candidate));
        self.paths.insert(path.clone());
        path
    }

    fn open_gap(&mut self, at: i64, width: i64) {
        for node in self.nodes.values_mut() {
            node.lft = shift_for_insert(node.lft, at, width);
            node.rgt = shift_for_insert(node.rgt, at, width);
        }
    }

    fn close_gap(&mut self, removed_rgt: i64, width: i64) {
        for node in self.nodes.values_mut() {
            node.lft = shift_for_delete(node.lft, removed_rgt, width);
            node.rgt = shift_for_delete(node.rgt, removed_rgt, width);
        }
    }

    fn sorted_by_lft(&self, filter: impl Fn(&Node) -> bool) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes.values().filter(|n| filter(n)).cloned().collect();
        nodes.sort_by_key(|n| n.lft);
        nodes
    }
}

/// Node repository held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryNodeRepository {
    owners: DashMap<OwnerId, Arc<RwLock<OwnerTree>>>,
}

impl MemoryNodeRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// The owner's tree, if it has been created.
    ///
    /// The map guard is dropped before returning so no shard lock is held
    /// across an `.await`.
    fn tree(&self, owner_id: OwnerId) -> Option<Arc<RwLock<OwnerTree>>> {
        self.owners.get(&owner_id).map(|entry| Arc::clone(entry.value()))
    }

    fn existing_tree(&self, owner_id: OwnerId) -> AppResult<Arc<RwLock<OwnerTree>>> {
        self.tree(owner_id)
            .ok_or_else(|| AppError::not_found(format!("Owner {owner_id} has no tree")))
    }
}

#[async_trait]
impl NodeRepository for MemoryNodeRepository {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn resolve_root(&self, owner_id: OwnerId) -> AppResult<Node> {
        let tree = Arc::clone(
            self.owners
                .entry(owner_id)
                .or_insert_with(|| {
                    debug!(%owner_id, "Created root node");
                    Arc::new(RwLock::new(OwnerTree::new(owner_id)))
                })
                .value(),
        );
        let guard = tree.read().await;
        guard.root().cloned()
    }

    async fn find_by_id(&self, owner_id: OwnerId, id: NodeId) -> AppResult<Option<Node>> {
        let Some(tree) = self.tree(owner_id) else {
            return Ok(None);
        };
        let guard = tree.read().await;
        Ok(guard.nodes.get(&id).cloned())
    }

    async fn find_by_path(&self, owner_id: OwnerId, path: &str) -> AppResult<Option<Node>> {
        let Some(tree) = self.tree(owner_id) else {
            return Ok(None);
        };
        let guard = tree.read().await;
        Ok(guard
            .nodes
            .values()
            .find(|n| !n.is_root() && n.path == path)
            .cloned())
    }

    async fn list_children(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Node>> {
        let Some(tree) = self.tree(owner_id) else {
            return Ok(PageResponse::empty(page));
        };
        let guard = tree.read().await;
        let mut children: Vec<&Node> = guard
            .nodes
            .values()
            .filter(|n| n.parent_id == Some(parent_id))
            .collect();
        children.sort_by(|a, b| {
            b.is_folder
                .cmp(&a.is_folder)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.lft.cmp(&a.lft))
        });

        let total = children.len() as u64;
        let items = children
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn children(&self, owner_id: OwnerId, parent_id: NodeId) -> AppResult<Vec<Node>> {
        let Some(tree) = self.tree(owner_id) else {
            return Ok(Vec::new());
        };
        let guard = tree.read().await;
        Ok(guard.sorted_by_lft(|n| n.parent_id == Some(parent_id)))
    }

    async fn ancestors(&self, node: &Node) -> AppResult<Vec<Node>> {
        let Some(tree) = self.tree(node.owner_id) else {
            return Ok(Vec::new());
        };
        let guard = tree.read().await;
        let Some(target) = guard.nodes.get(&node.id) else {
            return Ok(Vec::new());
        };
        let (lft, rgt) = (target.lft, target.rgt);
        let mut ancestors: Vec<Node> = guard
            .nodes
            .values()
            .filter(|n| n.lft < lft && n.rgt > rgt)
            .cloned()
            .collect();
        ancestors.sort_by_key(|n| std::cmp::Reverse(n.rgt - n.lft));
        Ok(ancestors)
    }

    async fn subtree(&self, node: &Node) -> AppResult<Vec<Node>> {
        let Some(tree) = self.tree(node.owner_id) else {
            return Ok(Vec::new());
        };
        let guard = tree.read().await;
        let Some(target) = guard.nodes.get(&node.id) else {
            return Ok(Vec::new());
        };
        let (lft, rgt) = (target.lft, target.rgt);
        Ok(guard.sorted_by_lft(|n| n.lft >= lft && n.rgt <= rgt))
    }

    async fn all_nodes(&self, owner_id: OwnerId) -> AppResult<Vec<Node>> {
        let Some(tree) = self.tree(owner_id) else {
            return Ok(Vec::new());
        };
        let guard = tree.read().await;
        Ok(guard.sorted_by_lft(|_| true))
    }

    async fn count(&self, owner_id: OwnerId) -> AppResult<u64> {
        let Some(tree) = self.tree(owner_id) else {
            return Ok(0);
        };
        let guard = tree.read().await;
        Ok(guard.nodes.len() as u64)
    }

    async fn insert_child(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        node: NewNode,
    ) -> AppResult<Node> {
        let tree = self.existing_tree(owner_id)?;
        let mut guard = tree.write().await;

        let parent = guard.folder(parent_id)?;
        guard.check_sibling_name(parent_id, &node)?;
        let base_path = path::child_path(parent, &node.name);
        let (lft, rgt) = insertion_slot(parent.rgt);

        guard.open_gap(lft, 2);
        let path = guard.claim_path(&base_path);
        let now = Utc::now();
        let inserted = Node {
            id: NodeId::new(),
            owner_id,
            parent_id: Some(parent_id),
            name: node.name,
            is_folder: node.is_folder,
            path,
            lft,
            rgt,
            storage_path: node.storage_path,
            mime: node.mime,
            size_bytes: node.size_bytes,
            created_at: now,
            updated_at: now,
        };
        guard.nodes.insert(inserted.id, inserted.clone());
        debug!(%owner_id, %parent_id, node_id = %inserted.id, lft, "Inserted node");
        Ok(inserted)
    }

    async fn insert_subtree(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        plan: &SubtreePlan,
    ) -> AppResult<Vec<Node>> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }
        let tree = self.existing_tree(owner_id)?;
        let mut guard = tree.write().await;

        let parent = guard.folder(parent_id)?.clone();
        for planned in plan.nodes() {
            if let Some(index) = planned.parent {
                if index >= plan.len() || !plan.nodes()[index].node.is_folder {
                    return Err(AppError::internal(format!(
                        "Planned parent #{index} is not a folder in the plan"
                    )));
                }
            } else {
                guard.check_sibling_name(parent_id, &planned.node)?;
            }
        }

        let base = parent.rgt;
        guard.open_gap(base, plan.width());

        let now = Utc::now();
        let mut created: Vec<Node> = Vec::with_capacity(plan.len());
        for planned in plan.nodes() {
            let under = match planned.parent {
                Some(index) => &created[index],
                None => &parent,
            };
            let base_path = path::child_path(under, &planned.node.name);
            let under_id = under.id;
            let path = guard.claim_path(&base_path);
            let node = Node {
                id: NodeId::new(),
                owner_id,
                parent_id: Some(under_id),
                name: planned.node.name.clone(),
                is_folder: planned.node.is_folder,
                path,
                lft: base + planned.lft,
                rgt: base + planned.rgt,
                storage_path: planned.node.storage_path.clone(),
                mime: planned.node.mime.clone(),
                size_bytes: planned.node.size_bytes,
                created_at: now,
                updated_at: now,
            };
            guard.nodes.insert(node.id, node.clone());
            created.push(node);
        }

        debug!(%owner_id, %parent_id, nodes = created.len(), "Inserted subtree");
        Ok(created)
    }

    async fn delete_subtree(&self, owner_id: OwnerId, node_id: NodeId) -> AppResult<Vec<Node>> {
        let tree = self.existing_tree(owner_id)?;
        let mut guard = tree.write().await;

        let target = guard
            .nodes
            .get(&node_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;
        if target.is_root() {
            return Err(AppError::invalid_input("The root folder cannot be deleted"));
        }

        let doomed: Vec<NodeId> = guard
            .nodes
            .values()
            .filter(|n| n.lft >= target.lft && n.rgt <= target.rgt)
            .map(|n| n.id)
            .collect();
        let mut removed: Vec<Node> = doomed
            .iter()
            .filter_map(|id| guard.nodes.remove(id))
            .collect();
        for node in &removed {
            guard.paths.remove(&node.path);
        }
        guard.close_gap(target.rgt, target.width());

        debug!(%owner_id, %node_id, removed = removed.len(), "Deleted subtree");
        removed.sort_by_key(|n| n.lft);
        Ok(removed)
    }
}
