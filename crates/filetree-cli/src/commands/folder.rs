//! Browsing and structural commands: ls, mkdir, tree, rm.

use clap::Args;

use super::Session;
use crate::output::{self, NodeRow, OutputFormat};
use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::types::id::NodeId;
use filetree_service::{CreateFolderRequest, DeleteNodesRequest};

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder path; the root when omitted
    pub path: Option<String>,
    /// Page number (1-based)
    #[arg(short, long)]
    pub page: Option<u64>,
    /// Items per page
    #[arg(short = 'n', long)]
    pub page_size: Option<u64>,
}

/// Arguments for `mkdir`
#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// Folder name
    pub name: String,
    /// Parent folder path; the root when omitted
    #[arg(short, long)]
    pub parent: Option<String>,
}

/// Arguments for `tree`
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Folder path; the root when omitted
    pub path: Option<String>,
}

/// Arguments for `rm`
#[derive(Debug, Args)]
pub struct RmArgs {
    /// Node IDs to delete
    pub ids: Vec<String>,
    /// Folder the deletion is issued from
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Delete every child of the parent folder
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,
    /// Skip the confirmation prompt for --all
    #[arg(short, long)]
    pub yes: bool,
}

/// List one page of a folder.
pub async fn ls(args: &LsArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let listing = session
        .services
        .hierarchy
        .list_folder(&session.ctx, args.path.as_deref(), args.page, args.page_size)
        .await?;

    if format == OutputFormat::Json {
        output::print_json(&listing);
        return Ok(());
    }

    let breadcrumb: Vec<&str> = listing
        .ancestors
        .iter()
        .map(|n| if n.path.is_empty() { "~" } else { n.name.as_str() })
        .collect();
    println!("{}", breadcrumb.join(" / "));

    let rows: Vec<NodeRow> = listing.items.items.iter().map(NodeRow::from).collect();
    output::print_list(&rows, format);
    println!(
        "page {}/{} ({} items)",
        listing.items.page,
        listing.items.total_pages.max(1),
        listing.items.total_items
    );
    Ok(())
}

/// Create a folder.
pub async fn mkdir(args: &MkdirArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let folder = session
        .services
        .hierarchy
        .create_folder(
            &session.ctx,
            CreateFolderRequest::new(args.name.clone(), args.parent.as_deref()),
        )
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&filetree_entity::NodeResource::from(folder)),
        OutputFormat::Table => {
            output::print_success(&format!("Folder '{}' created (id: {})", folder.name, folder.id));
            output::print_kv("Path", &folder.path);
        }
    }
    Ok(())
}

/// Print a folder and all of its descendants.
pub async fn tree(args: &TreeArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let tree = session
        .services
        .hierarchy
        .folder_tree(&session.ctx, args.path.as_deref())
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&tree),
        OutputFormat::Table => {
            output::print_tree(&tree.root);
            println!("{} node(s)", tree.total_nodes);
        }
    }
    Ok(())
}

/// Delete nodes recursively.
pub async fn rm(args: &RmArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let request = if args.all {
        if !args.yes && !confirm_delete_all(args.parent.as_deref())? {
            println!("Cancelled.");
            return Ok(());
        }
        DeleteNodesRequest::all_children(args.parent.as_deref())
    } else {
        let ids = args
            .ids
            .iter()
            .map(|raw| {
                raw.parse::<NodeId>()
                    .map_err(|e| AppError::invalid_input(format!("Invalid node id '{raw}': {e}")))
            })
            .collect::<AppResult<Vec<_>>>()?;
        DeleteNodesRequest::ids(args.parent.as_deref(), ids)
    };

    let report = session
        .services
        .hierarchy
        .delete_nodes(&session.ctx, request)
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success(&format!(
                "Deleted {} node(s) under {} target(s)",
                report.removed_nodes,
                report.deleted.len()
            ));
            output::print_kv("Blobs removed", &report.forgotten_blobs.to_string());
            for orphan in &report.orphaned_blobs {
                output::print_warning(&format!("Blob left behind: {orphan}"));
            }
        }
    }
    Ok(())
}

fn confirm_delete_all(parent: Option<&str>) -> AppResult<bool> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Delete EVERYTHING inside '{}'?",
            parent.unwrap_or("/")
        ))
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
