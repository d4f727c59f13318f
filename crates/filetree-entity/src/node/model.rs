//! Node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use filetree_core::error::AppError;
use filetree_core::types::id::{NodeId, OwnerId};

/// Whether a node is a folder or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A folder that can hold children.
    Folder,
    /// A file whose bytes live in the blob store.
    File,
}

/// A folder or file in an owner's tree.
///
/// The `(lft, rgt)` pair is the authoritative encoding of the tree shape:
/// a node's interval strictly contains the intervals of all of its
/// descendants. `parent_id` is a denormalized convenience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// The user who owns the tree this node belongs to.
    pub owner_id: OwnerId,
    /// Parent node (null only for the owner's root).
    pub parent_id: Option<NodeId>,
    /// Display name.
    pub name: String,
    /// Folder or file.
    pub is_folder: bool,
    /// Materialized slug path, unique per owner (empty for the root).
    pub path: String,
    /// Left nested-set index.
    pub lft: i64,
    /// Right nested-set index.
    pub rgt: i64,
    /// Blob store handle (files only).
    pub storage_path: Option<String>,
    /// MIME type (files only).
    pub mime: Option<String>,
    /// Size in bytes (files only).
    pub size_bytes: Option<i64>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Check if this is the owner's root node.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Return the node kind.
    pub fn kind(&self) -> NodeKind {
        if self.is_folder {
            NodeKind::Folder
        } else {
            NodeKind::File
        }
    }

    /// Number of index slots the subtree rooted here occupies.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of descendants below this node.
    pub fn descendant_count(&self) -> u64 {
        ((self.rgt - self.lft - 1) / 2) as u64
    }

    /// Whether `other` lies strictly inside this node's subtree.
    pub fn contains(&self, other: &Node) -> bool {
        self.owner_id == other.owner_id && self.lft < other.lft && other.rgt < self.rgt
    }
}

/// Data required to insert a new node under a parent.
///
/// Indices, path, and timestamps are assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    /// Display name.
    pub name: String,
    /// Folder or file.
    pub is_folder: bool,
    /// Blob store handle (files only).
    pub storage_path: Option<String>,
    /// MIME type (files only).
    pub mime: Option<String>,
    /// Size in bytes (files only).
    pub size_bytes: Option<i64>,
    /// Which existing siblings make the name unusable.
    #[serde(default)]
    pub sibling_rule: SiblingRule,
}

/// Name uniqueness enforced among a new node's siblings.
///
/// Checked by the repository while it holds the owner's write lock, so two
/// concurrent inserts cannot both pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingRule {
    /// Duplicate names are allowed.
    #[default]
    Allow,
    /// A sibling folder with the same name blocks the insert.
    UniqueFolder,
    /// Any sibling with the same name blocks the insert.
    Unique,
}

impl SiblingRule {
    /// Whether an existing sibling of the given kind blocks a same-named node.
    pub fn blocked_by(self, sibling_is_folder: bool) -> bool {
        match self {
            Self::Allow => false,
            Self::UniqueFolder => sibling_is_folder,
            Self::Unique => true,
        }
    }
}

impl NewNode {
    /// Describe a new folder.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
            storage_path: None,
            mime: None,
            size_bytes: None,
            sibling_rule: SiblingRule::Allow,
        }
    }

    /// Describe a new file whose bytes are already stored at `storage_path`.
    pub fn file(
        name: impl Into<String>,
        storage_path: impl Into<String>,
        mime: impl Into<String>,
        size_bytes: i64,
    ) -> Self {
        Self {
            name: name.into(),
            is_folder: false,
            storage_path: Some(storage_path.into()),
            mime: Some(mime.into()),
            size_bytes: Some(size_bytes),
            sibling_rule: SiblingRule::Allow,
        }
    }

    /// Require the name to be free among siblings according to `rule`.
    pub fn with_sibling_rule(mut self, rule: SiblingRule) -> Self {
        self.sibling_rule = rule;
        self
    }

    /// The error reported when `rule` rejects this node's name.
    pub fn name_taken(&self) -> AppError {
        AppError::invalid_input(format!(
            "'{}' already exists in the target folder",
            self.name
        ))
    }
}

/// The representation of a node handed to callers (listings, ancestor
/// chains, import results).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResource {
    /// Node identifier.
    pub id: NodeId,
    /// Parent node, if any.
    pub parent_id: Option<NodeId>,
    /// Display name.
    pub name: String,
    /// Folder or file.
    pub kind: NodeKind,
    /// Convenience flag mirroring `kind`.
    pub is_folder: bool,
    /// Materialized path.
    pub path: String,
    /// MIME type (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Size in bytes (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
}

impl From<&Node> for NodeResource {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            name: node.name.clone(),
            kind: node.kind(),
            is_folder: node.is_folder,
            path: node.path.clone(),
            mime: node.mime.clone(),
            size: node.size_bytes,
            created_at: node.created_at,
        }
    }
}

impl From<Node> for NodeResource {
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            kind: node.kind(),
            is_folder: node.is_folder,
            name: node.name,
            path: node.path,
            mime: node.mime,
            size: node.size_bytes,
            created_at: node.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(lft: i64, rgt: i64) -> Node {
        let now = Utc::now();
        Node {
            id: NodeId::new(),
            owner_id: OwnerId::from_uuid(uuid::Uuid::nil()),
            parent_id: Some(NodeId::new()),
            name: "docs".into(),
            is_folder: true,
            path: "docs".into(),
            lft,
            rgt,
            storage_path: None,
            mime: None,
            size_bytes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_interval_helpers() {
        let outer = node(2, 9);
        let inner = node(3, 4);
        assert_eq!(outer.width(), 8);
        assert_eq!(outer.descendant_count(), 3);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outer));
    }

    #[test]
    fn test_resource_hides_file_fields_for_folders() {
        let resource = NodeResource::from(&node(2, 3));
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["kind"], "folder");
        assert_eq!(json["is_folder"], true);
        assert!(json.get("mime").is_none());
        assert!(json.get("size").is_none());
    }

    #[test]
    fn test_new_file_records_blob_fields() {
        let new = NewNode::file("a.txt", "files/u/abc.txt", "text/plain", 12);
        assert!(!new.is_folder);
        assert_eq!(new.storage_path.as_deref(), Some("files/u/abc.txt"));
        assert_eq!(new.size_bytes, Some(12));
    }

    #[test]
    fn test_sibling_rules() {
        assert!(!SiblingRule::Allow.blocked_by(true));
        assert!(SiblingRule::UniqueFolder.blocked_by(true));
        assert!(!SiblingRule::UniqueFolder.blocked_by(false));
        assert!(SiblingRule::Unique.blocked_by(false));

        let new = NewNode::folder("docs").with_sibling_rule(SiblingRule::Unique);
        assert_eq!(new.sibling_rule, SiblingRule::Unique);
        assert_eq!(NewNode::folder("docs").sibling_rule, SiblingRule::Allow);
    }
}
