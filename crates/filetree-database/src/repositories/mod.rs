//! Repository implementations.

pub mod node;
