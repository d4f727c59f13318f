//! Hierarchy and import engine configuration.

use serde::{Deserialize, Serialize};

/// How a tree import commits its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// The whole subtree is inserted in one repository transaction.
    #[default]
    Atomic,
    /// Nodes are inserted one at a time; a failure leaves a partial tree.
    Incremental,
}

/// Settings for listing and importing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Page size used when the caller does not pass one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Upper bound for caller-supplied page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Default commit mode for tree imports.
    #[serde(default)]
    pub import_mode: ImportMode,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            import_mode: ImportMode::default(),
        }
    }
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}
