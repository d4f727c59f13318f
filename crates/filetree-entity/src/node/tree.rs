//! Nested tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use filetree_core::types::id::NodeId;

use super::model::{Node, NodeKind};

/// A node with its children materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node ID.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Materialized path.
    pub path: String,
    /// Folder or file.
    pub kind: NodeKind,
    /// Size in bytes (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Children in left-index order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(node: &Node) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind(),
            size: node.size_bytes,
            children: Vec::new(),
        }
    }
}

/// A subtree rebuilt from its nested-set rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTree {
    /// The subtree's top node.
    pub root: TreeNode,
    /// Total number of nodes, including the top node.
    pub total_nodes: u64,
}

impl NodeTree {
    /// Rebuild a tree from the rows of one subtree.
    ///
    /// The node with the smallest left index becomes the root. Returns
    /// `None` for an empty slice.
    pub fn from_subtree(nodes: &[Node]) -> Option<Self> {
        let mut ordered: Vec<&Node> = nodes.iter().collect();
        ordered.sort_by_key(|n| n.lft);

        let mut stack: Vec<(TreeNode, i64)> = Vec::new();
        for node in ordered {
            while stack.len() > 1 && stack.last().is_some_and(|(_, rgt)| *rgt < node.lft) {
                fold_top(&mut stack);
            }
            stack.push((TreeNode::leaf(node), node.rgt));
        }
        while stack.len() > 1 {
            fold_top(&mut stack);
        }

        stack.pop().map(|(root, _)| Self {
            root,
            total_nodes: nodes.len() as u64,
        })
    }
}

fn fold_top(stack: &mut Vec<(TreeNode, i64)>) {
    if let Some((child, _)) = stack.pop() {
        if let Some((parent, _)) = stack.last_mut() {
            parent.children.push(child);
        }
    }
}
