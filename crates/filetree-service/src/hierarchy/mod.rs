//! Hierarchy engine: structural operations on an owner's tree.

pub mod requests;
pub mod service;

pub use requests::{CreateFolderRequest, DeleteNodesRequest, DeleteReport, FolderListing};
pub use service::HierarchyService;
