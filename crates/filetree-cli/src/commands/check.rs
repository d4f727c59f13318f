//! Backend health and tree integrity check.

use clap::Args;
use serde::Serialize;

use super::Session;
use crate::output::{self, OutputFormat};
use filetree_core::result::AppResult;
use filetree_core::traits::BlobStore;
use filetree_database::NodeRepository;

/// Arguments for the check command
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Only probe the backends; skip the tree walk
    #[arg(long)]
    pub health_only: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    repository: String,
    repository_healthy: bool,
    blob_store: String,
    blob_store_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    nodes: Option<u64>,
}

/// Probe both backends, then verify the owner's nested-set indices.
pub async fn execute(args: &CheckArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let services = &session.services;
    let mut report = CheckReport {
        repository: services.nodes.backend_name().to_string(),
        repository_healthy: services.nodes.health_check().await?,
        blob_store: services.blobs.provider_type().to_string(),
        blob_store_healthy: services.blobs.health_check().await?,
        nodes: None,
    };
    if !args.health_only {
        report.nodes = Some(services.hierarchy.verify_tree(&session.ctx).await?);
    }

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_kv(&format!("Repository ({})", report.repository), status(report.repository_healthy));
            output::print_kv(&format!("Blob store ({})", report.blob_store), status(report.blob_store_healthy));
            if let Some(nodes) = report.nodes {
                output::print_success(&format!("Tree of {} is consistent ({nodes} nodes)", session.ctx.owner_id));
            }
        }
    }
    Ok(())
}

fn status(healthy: bool) -> &'static str {
    if healthy { "ok" } else { "unhealthy" }
}
