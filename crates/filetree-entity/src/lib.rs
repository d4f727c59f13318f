//! # filetree-entity
//!
//! Domain entity models for FileTree. The single persisted entity is the
//! [`Node`](node::Node): a folder or file placed in its owner's tree by a
//! pair of nested-set indices. Alongside it live the pure rules that keep
//! those indices and the materialized paths consistent.

pub mod node;

pub use node::{NewNode, Node, NodeKind, NodeResource, SiblingRule};
