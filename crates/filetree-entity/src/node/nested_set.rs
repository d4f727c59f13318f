//! Nested-set index arithmetic.
//!
//! Every owner has one index space. The root spans `[1, 2n]` for a tree of
//! `n` nodes and every interval strictly contains its descendants'
//! intervals. Both repository implementations shift indices with exactly
//! these rules, so the PostgreSQL `UPDATE ... CASE` statements and the
//! in-memory store stay interchangeable.

use thiserror::Error;

use filetree_core::types::id::NodeId;

use super::model::Node;

/// Left index of a freshly created root.
pub const ROOT_LFT: i64 = 1;
/// Right index of a freshly created root.
pub const ROOT_RGT: i64 = 2;

/// Indices for a new last child of a parent whose right index is
/// `parent_rgt`: the slot just before the parent's closing index.
pub fn insertion_slot(parent_rgt: i64) -> (i64, i64) {
    (parent_rgt, parent_rgt + 1)
}

/// Move an index that sits at or after the insertion point `at` by `by`.
pub fn shift_for_insert(index: i64, at: i64, by: i64) -> i64 {
    if index >= at { index + by } else { index }
}

/// Close the gap left by a removed interval ending at `removed_rgt`.
pub fn shift_for_delete(index: i64, removed_rgt: i64, width: i64) -> i64 {
    if index > removed_rgt {
        index - width
    } else {
        index
    }
}

/// A broken nested-set invariant found by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NestedSetViolation {
    /// No node without a parent, or the root does not start at 1.
    #[error("tree has no root spanning the index space")]
    MissingRoot,
    /// More than one top-level interval.
    #[error("node {0} sits outside the root interval")]
    MultipleRoots(NodeId),
    /// The indices are not exactly `1..=2n`.
    #[error("index space is not contiguous: expected {expected}, found {found}")]
    IndexGap {
        /// The next index that should have been present.
        expected: i64,
        /// The index actually found.
        found: i64,
    },
    /// `lft >= rgt` or an even-width interval.
    #[error("node {0} has a malformed interval")]
    MalformedInterval(NodeId),
    /// An interval overlaps its enclosing interval without nesting.
    #[error("node {0} overlaps its enclosing interval")]
    Overlap(NodeId),
    /// `parent_id` disagrees with the interval nesting.
    #[error("node {id} records parent {recorded:?} but is nested under {actual}")]
    WrongParent {
        /// The offending node.
        id: NodeId,
        /// The parent recorded on the row.
        recorded: Option<NodeId>,
        /// The parent implied by the intervals.
        actual: NodeId,
    },
}

/// Check the nested-set invariant over one owner's complete tree.
///
/// Every interval must be well formed, the indices must cover `1..=2n`
/// without gaps or duplicates, intervals must nest without overlapping,
/// and each `parent_id` must name the tightest enclosing interval.
pub fn verify(nodes: &[Node]) -> Result<(), NestedSetViolation> {
    if nodes.is_empty() {
        return Ok(());
    }

    for node in nodes {
        if node.lft >= node.rgt || (node.rgt - node.lft) % 2 == 0 {
            return Err(NestedSetViolation::MalformedInterval(node.id));
        }
    }

    let mut indices: Vec<i64> = nodes.iter().flat_map(|n| [n.lft, n.rgt]).collect();
    indices.sort_unstable();
    for (expected, found) in (1..).zip(indices.iter().copied()) {
        if expected != found {
            return Err(NestedSetViolation::IndexGap { expected, found });
        }
    }

    let mut ordered: Vec<&Node> = nodes.iter().collect();
    ordered.sort_by_key(|n| n.lft);

    let root = ordered[0];
    if root.lft != ROOT_LFT || root.parent_id.is_some() {
        return Err(NestedSetViolation::MissingRoot);
    }

    let mut stack: Vec<&Node> = Vec::new();
    for (position, node) in ordered.into_iter().enumerate() {
        while stack.last().is_some_and(|top| top.rgt < node.lft) {
            stack.pop();
        }
        match stack.last() {
            None if position > 0 => return Err(NestedSetViolation::MultipleRoots(node.id)),
            None => {}
            Some(enclosing) => {
                if node.rgt > enclosing.rgt {
                    return Err(NestedSetViolation::Overlap(node.id));
                }
                if node.parent_id != Some(enclosing.id) {
                    return Err(NestedSetViolation::WrongParent {
                        id: node.id,
                        recorded: node.parent_id,
                        actual: enclosing.id,
                    });
                }
            }
        }
        stack.push(node);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use filetree_core::types::id::OwnerId;

    use super::*;

    fn node(id: NodeId, parent: Option<NodeId>, lft: i64, rgt: i64) -> Node {
        let now = Utc::now();
        Node {
            id,
            owner_id: OwnerId::from_uuid(uuid::Uuid::nil()),
            parent_id: parent,
            name: String::new(),
            is_folder: true,
            path: String::new(),
            lft,
            rgt,
            storage_path: None,
            mime: None,
            size_bytes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// root(1,8) -> a(2,5) -> b(3,4); c(6,7)
    fn sample() -> Vec<Node> {
        let (root, a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new());
        vec![
            node(root, None, 1, 8),
            node(a, Some(root), 2, 5),
            node(b, Some(a), 3, 4),
            node(c, Some(root), 6, 7),
        ]
    }

    #[test]
    fn test_insertion_slot_reserves_two_indices_before_parent_close() {
        assert_eq!(insertion_slot(ROOT_RGT), (2, 3));
        assert_eq!(shift_for_insert(2, 2, 2), 4);
        assert_eq!(shift_for_insert(1, 2, 2), 1);
    }

    #[test]
    fn test_delete_shift_closes_gap() {
        // Removing a(2,5) frees a width of 4.
        assert_eq!(shift_for_delete(6, 5, 4), 2);
        assert_eq!(shift_for_delete(8, 5, 4), 4);
        assert_eq!(shift_for_delete(1, 5, 4), 1);
    }

    #[test]
    fn test_verify_accepts_well_formed_tree() {
        assert_eq!(verify(&sample()), Ok(()));
        assert_eq!(verify(&[]), Ok(()));
    }

    #[test]
    fn test_verify_detects_gap() {
        let mut nodes = sample();
        nodes[3].lft = 9;
        nodes[3].rgt = 10;
        assert!(matches!(
            verify(&nodes),
            Err(NestedSetViolation::IndexGap { expected: 6, .. })
        ));
    }

    #[test]
    fn test_verify_detects_wrong_parent() {
        let mut nodes = sample();
        let root_id = nodes[0].id;
        nodes[2].parent_id = Some(root_id);
        assert!(matches!(
            verify(&nodes),
            Err(NestedSetViolation::WrongParent { .. })
        ));
    }

    #[test]
    fn test_verify_detects_even_width() {
        let mut nodes = sample();
        nodes[2].rgt = 5;
        nodes[1].rgt = 4;
        assert!(matches!(
            verify(&nodes),
            Err(NestedSetViolation::MalformedInterval(_))
        ));
    }

    #[test]
    fn test_verify_detects_overlap() {
        let (root, a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new());
        let nodes = vec![
            node(root, None, 1, 8),
            node(a, Some(root), 2, 5),
            node(b, Some(a), 3, 6),
            node(c, Some(a), 4, 7),
        ];
        assert!(matches!(verify(&nodes), Err(NestedSetViolation::Overlap(_))));
    }
}
