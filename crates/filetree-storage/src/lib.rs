//! # filetree-storage
//!
//! Blob store implementations for FileTree. File nodes only record the
//! opaque storage path returned by [`BlobStore::put`]; the bytes live in
//! one of the providers here, selected by [`StorageManager`].
//!
//! [`BlobStore::put`]: filetree_core::traits::BlobStore::put

pub mod keys;
pub mod manager;
pub mod providers;

pub use manager::StorageManager;
pub use providers::{LocalBlobStore, MemoryBlobStore};
