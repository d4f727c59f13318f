//! CLI command definitions and dispatch.

pub mod check;
pub mod folder;
pub mod migrate;
pub mod upload;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use filetree_core::config::AppConfig;
use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::types::id::OwnerId;
use filetree_service::{RequestContext, ServiceRegistry};

/// FileTree: per-owner folder/file trees over a nested-set index
#[derive(Debug, Parser)]
#[command(name = "filetree", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (without extension); overrides --env
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Environment overlay loaded on top of config/default
    #[arg(long, env = "FILETREE_ENV", default_value = "development", global = true)]
    pub env: String,

    /// Owner whose tree is operated on
    #[arg(short, long, env = "FILETREE_OWNER", global = true)]
    pub owner: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate(migrate::MigrateArgs),
    /// List one page of a folder
    Ls(folder::LsArgs),
    /// Create a folder
    Mkdir(folder::MkdirArgs),
    /// Show a folder and everything beneath it
    Tree(folder::TreeArgs),
    /// Delete nodes and their descendants
    Rm(folder::RmArgs),
    /// Store local files in a folder
    Upload(upload::UploadArgs),
    /// Import a local directory tree
    Import(upload::ImportArgs),
    /// Check backend health and tree integrity
    Check(check::CheckArgs),
}

impl Cli {
    /// Load configuration from `--config` or the `--env` overlay.
    pub fn load_config(&self) -> AppResult<AppConfig> {
        match &self.config {
            Some(path) => AppConfig::load_file(path),
            None => AppConfig::load(&self.env),
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Ls(args) => folder::ls(args, &self.session(&config).await?, self.format).await,
            Commands::Mkdir(args) => folder::mkdir(args, &self.session(&config).await?, self.format).await,
            Commands::Tree(args) => folder::tree(args, &self.session(&config).await?, self.format).await,
            Commands::Rm(args) => folder::rm(args, &self.session(&config).await?, self.format).await,
            Commands::Upload(args) => upload::upload(args, &self.session(&config).await?, self.format).await,
            Commands::Import(args) => upload::import(args, &self.session(&config).await?, self.format).await,
            Commands::Check(args) => check::execute(args, &self.session(&config).await?, self.format).await,
        }
    }

    async fn session(&self, config: &AppConfig) -> AppResult<Session> {
        let owner = self
            .owner
            .as_deref()
            .ok_or_else(|| AppError::invalid_input("No owner given: pass --owner or set FILETREE_OWNER"))?;
        let owner_id: OwnerId = owner
            .parse()
            .map_err(|e| AppError::invalid_input(format!("Invalid owner id '{owner}': {e}")))?;

        Ok(Session {
            services: ServiceRegistry::build(config).await?,
            ctx: RequestContext::new(owner_id),
        })
    }
}

/// Services plus the acting owner, shared by every tree command.
pub struct Session {
    /// Wired services.
    pub services: ServiceRegistry,
    /// Acting owner.
    pub ctx: RequestContext,
}
