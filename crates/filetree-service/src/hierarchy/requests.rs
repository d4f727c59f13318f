//! Request and response types for hierarchy operations.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use filetree_core::types::id::NodeId;
use filetree_core::types::pagination::PageResponse;
use filetree_entity::node::NodeResource;

/// Request to create a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder display name.
    #[validate(
        length(min = 1, max = 255, message = "must be 1-255 characters"),
        custom(function = "validate_node_name")
    )]
    pub name: String,
    /// Path of the parent folder; the root when absent.
    #[serde(default)]
    pub parent_path: Option<String>,
}

impl CreateFolderRequest {
    /// Create a folder request.
    pub fn new(name: impl Into<String>, parent_path: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent_path: parent_path.map(str::to_string),
        }
    }
}

/// Reject names that are blank or could not round-trip through a path.
pub fn validate_node_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    if name.contains('/') || name.chars().any(char::is_control) {
        return Err(ValidationError::new("forbidden_character")
            .with_message("must not contain '/' or control characters".into()));
    }
    Ok(())
}

/// Request to delete nodes under a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteNodesRequest {
    /// The folder the request was issued from; the root when absent.
    #[serde(default)]
    pub parent_path: Option<String>,
    /// Delete every direct child of the parent.
    #[serde(default)]
    pub all: bool,
    /// Nodes to delete when `all` is false.
    #[serde(default)]
    pub ids: Vec<NodeId>,
}

impl DeleteNodesRequest {
    /// Delete every child of the folder at `parent_path`.
    pub fn all_children(parent_path: Option<&str>) -> Self {
        Self {
            parent_path: parent_path.map(str::to_string),
            all: true,
            ids: Vec::new(),
        }
    }

    /// Delete the listed nodes.
    pub fn ids(parent_path: Option<&str>, ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            parent_path: parent_path.map(str::to_string),
            all: false,
            ids: ids.into_iter().collect(),
        }
    }
}

/// One page of a folder plus the chain leading to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderListing {
    /// The listed folder.
    pub folder: NodeResource,
    /// Its children: folders first, newest first.
    pub items: PageResponse<NodeResource>,
    /// Root first, ending with the listed folder itself.
    pub ancestors: Vec<NodeResource>,
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Subtree tops that were removed.
    pub deleted: Vec<NodeId>,
    /// Total rows removed, descendants included.
    pub removed_nodes: u64,
    /// Blobs successfully forgotten.
    pub forgotten_blobs: u64,
    /// Storage paths whose blob could not be deleted.
    pub orphaned_blobs: Vec<String>,
}
