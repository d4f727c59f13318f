//! Core traits defined in `filetree-core` and implemented by other crates.

pub mod storage;

pub use storage::BlobStore;
