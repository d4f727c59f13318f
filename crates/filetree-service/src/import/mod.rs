//! Tree import engine and its input model.

pub mod service;
pub mod tree;

pub use service::{ImportOptions, ImportReport, ImportService};
pub use tree::{FilePayload, TreeDescription, TreeEntry, TreeStats};
