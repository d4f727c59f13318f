//! # filetree-service
//!
//! The engines behind every caller-facing tree operation. Services take
//! their dependencies as `Arc` references at construction time and receive
//! a [`RequestContext`] naming the acting owner on every call.
//!
//! - [`HierarchyService`]: root resolution, folder creation, listing with
//!   ancestor chains, recursive deletion, integrity checks.
//! - [`ImportService`]: whole-tree and flat multi-file uploads.

pub mod context;
pub mod hierarchy;
pub mod import;
pub mod registry;

pub use context::RequestContext;
pub use hierarchy::{
    CreateFolderRequest, DeleteNodesRequest, DeleteReport, FolderListing, HierarchyService,
};
pub use import::{FilePayload, ImportOptions, ImportReport, ImportService, TreeDescription, TreeEntry};
pub use registry::ServiceRegistry;
