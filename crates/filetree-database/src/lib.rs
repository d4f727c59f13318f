//! # filetree-database
//!
//! Durable storage of every owner's folder/file hierarchy. The
//! [`NodeRepository`] trait is the tree contract; [`PgNodeRepository`]
//! implements it on PostgreSQL and [`MemoryNodeRepository`] in process
//! memory. Both serialize index mutations per owner and apply each
//! insert or delete as one all-or-nothing unit.

pub mod connection;
pub mod error;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use migration::PendingMigration;
pub use repositories::node::{
    MemoryNodeRepository, NodeRepository, PgNodeRepository, connect_node_repository,
};
