//! Layout of a whole subtree inserted in one step.
//!
//! An import describes many nodes at once. Instead of shifting the owner's
//! index space once per node, the plan assigns every new node an interval
//! relative to the insertion point so the repository can open a single gap
//! of `2n` indices and write all rows into it.

use filetree_core::{AppError, AppResult};

use super::model::NewNode;

/// A node placed inside a [`SubtreePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
    /// Index of the planned parent, or `None` for a direct child of the
    /// insertion target.
    pub parent: Option<usize>,
    /// The node to create.
    pub node: NewNode,
    /// Left index, relative to the insertion point.
    pub lft: i64,
    /// Right index, relative to the insertion point.
    pub rgt: i64,
}

/// A laid-out forest of new nodes, in parent-before-child order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreePlan {
    nodes: Vec<PlannedNode>,
}

impl SubtreePlan {
    /// Start describing a subtree.
    pub fn builder() -> SubtreePlanBuilder {
        SubtreePlanBuilder::default()
    }

    /// Planned nodes in insertion order. Parents always precede children.
    pub fn nodes(&self) -> &[PlannedNode] {
        &self.nodes
    }

    /// Number of planned nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the plan creates nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index slots the plan occupies once inserted.
    pub fn width(&self) -> i64 {
        2 * self.nodes.len() as i64
    }
}

/// Collects nodes for a [`SubtreePlan`].
#[derive(Debug, Default)]
pub struct SubtreePlanBuilder {
    entries: Vec<(Option<usize>, NewNode)>,
}

impl SubtreePlanBuilder {
    /// Add a node under a previously pushed folder (or at the top level
    /// when `parent` is `None`) and return its index.
    pub fn push(&mut self, parent: Option<usize>, node: NewNode) -> AppResult<usize> {
        if let Some(index) = parent {
            match self.entries.get(index) {
                Some((_, entry)) if entry.is_folder => {}
                Some(_) => {
                    return Err(AppError::invalid_input(format!(
                        "Cannot place '{}' under file '{}'",
                        node.name, self.entries[index].1.name
                    )));
                }
                None => {
                    return Err(AppError::internal(format!(
                        "Planned parent #{index} does not exist"
                    )));
                }
            }
        }
        self.entries.push((parent, node));
        Ok(self.entries.len() - 1)
    }

    /// Assign relative intervals with a depth-first walk.
    pub fn build(self) -> SubtreePlan {
        let count = self.entries.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut top_level = Vec::new();
        for (index, (parent, _)) in self.entries.iter().enumerate() {
            match parent {
                Some(p) => children[*p].push(index),
                None => top_level.push(index),
            }
        }

        let mut lft = vec![0i64; count];
        let mut rgt = vec![0i64; count];
        let mut counter = 0i64;
        let mut stack: Vec<(usize, bool)> = top_level.iter().rev().map(|&i| (i, false)).collect();
        while let Some((index, closing)) = stack.pop() {
            if closing {
                rgt[index] = counter;
                counter += 1;
                continue;
            }
            lft[index] = counter;
            counter += 1;
            stack.push((index, true));
            stack.extend(children[index].iter().rev().map(|&c| (c, false)));
        }

        let nodes = self
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, (parent, node))| PlannedNode {
                parent,
                node,
                lft: lft[index],
                rgt: rgt[index],
            })
            .collect();
        SubtreePlan { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_nests_children_inside_parents() {
        let mut builder = SubtreePlan::builder();
        let photos = builder.push(None, NewNode::folder("photos")).unwrap();
        let trip = builder.push(Some(photos), NewNode::folder("trip")).unwrap();
        builder
            .push(Some(trip), NewNode::file("a.jpg", "k1", "image/jpeg", 1))
            .unwrap();
        builder
            .push(None, NewNode::file("notes.txt", "k2", "text/plain", 2))
            .unwrap();
        let plan = builder.build();

        let spans: Vec<(i64, i64)> = plan.nodes().iter().map(|n| (n.lft, n.rgt)).collect();
        assert_eq!(spans, vec![(0, 5), (1, 4), (2, 3), (6, 7)]);
        assert_eq!(plan.width(), 8);
        assert_eq!(plan.nodes()[2].parent, Some(1));
    }

    #[test]
    fn test_push_under_file_is_rejected() {
        let mut builder = SubtreePlan::builder();
        let file = builder
            .push(None, NewNode::file("a.txt", "k", "text/plain", 1))
            .unwrap();
        let err = builder.push(Some(file), NewNode::folder("x")).unwrap_err();
        assert_eq!(err.kind, filetree_core::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_plan() {
        let plan = SubtreePlan::builder().build();
        assert!(plan.is_empty());
        assert_eq!(plan.width(), 0);
    }
}
