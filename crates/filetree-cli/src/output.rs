//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use filetree_entity::node::{NodeKind, NodeResource, TreeNode};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One node as a table row.
#[derive(Debug, Serialize, Tabled)]
pub struct NodeRow {
    /// Node ID
    id: String,
    /// Folder or file
    kind: String,
    /// Name
    name: String,
    /// Path
    path: String,
    /// Size
    size: String,
    /// MIME type
    mime: String,
    /// Created at
    created_at: String,
}

impl From<&NodeResource> for NodeRow {
    fn from(node: &NodeResource) -> Self {
        Self {
            id: node.id.to_string(),
            kind: match node.kind {
                NodeKind::Folder => "folder".to_string(),
                NodeKind::File => "file".to_string(),
            },
            name: node.name.clone(),
            path: node.path.clone(),
            size: node.size.map(human_size).unwrap_or_default(),
            mime: node.mime.clone().unwrap_or_default(),
            created_at: node.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("(empty)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    println!("{json}");
}

/// Print a subtree with box-drawing guides.
pub fn print_tree(root: &TreeNode) {
    println!("{}", display_name(root));
    let mut pending: Vec<(&TreeNode, String, bool)> = root
        .children
        .iter()
        .rev()
        .enumerate()
        .map(|(i, child)| (child, String::new(), i == 0))
        .collect();

    while let Some((node, prefix, last)) = pending.pop() {
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        println!("{prefix}{branch}{}", display_name(node));
        let child_prefix = format!("{prefix}{indent}");
        pending.extend(
            node.children
                .iter()
                .rev()
                .enumerate()
                .map(|(i, child)| (child, child_prefix.clone(), i == 0)),
        );
    }
}

fn display_name(node: &TreeNode) -> String {
    match (node.kind, node.size) {
        (NodeKind::Folder, _) => format!("{}/", node.name),
        (NodeKind::File, Some(size)) => format!("{} ({})", node.name, human_size(size)),
        (NodeKind::File, None) => node.name.clone(),
    }
}

/// Format a byte count with a binary unit.
pub fn human_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}
