//! Node domain entities.

pub mod model;
pub mod nested_set;
pub mod path;
pub mod plan;
pub mod tree;

pub use model::{NewNode, Node, NodeKind, NodeResource, SiblingRule};
pub use nested_set::NestedSetViolation;
pub use plan::{PlannedNode, SubtreePlan, SubtreePlanBuilder};
pub use tree::{NodeTree, TreeNode};
