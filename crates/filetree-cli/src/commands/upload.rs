//! File upload and directory import commands.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Session;
use crate::output::{self, NodeRow, OutputFormat};
use filetree_core::config::ImportMode;
use filetree_core::error::{AppError, ErrorKind};
use filetree_core::result::AppResult;
use filetree_service::{FilePayload, ImportOptions, ImportReport, TreeDescription};

/// Import commit strategy as a CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// All or nothing
    Atomic,
    /// Node by node; keeps a partial tree on failure
    Incremental,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Atomic => ImportMode::Atomic,
            ModeArg::Incremental => ImportMode::Incremental,
        }
    }
}

/// Arguments for `upload`
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Local files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Target folder path; the root when omitted
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Commit strategy; the configured default when omitted
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

/// Arguments for `import`
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Local directory to import; it becomes a folder of the same name
    pub dir: PathBuf,
    /// Target folder path; the root when omitted
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Commit strategy; the configured default when omitted
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

/// Upload local files into one folder.
pub async fn upload(args: &UploadArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let mut payloads = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let name = file_name(file)?;
        payloads.push(FilePayload::new(name, read_bytes(file).await?));
    }

    let options = options(session, args.mode);
    let report = session
        .services
        .import
        .save_files(&session.ctx, args.parent.as_deref(), payloads, options)
        .await?;
    print_report(&report, format);
    Ok(())
}

/// Import a local directory tree.
pub async fn import(args: &ImportArgs, session: &Session, format: OutputFormat) -> AppResult<()> {
    let top = file_name(&args.dir)?;
    let files = collect_files(&args.dir).await?;
    if files.is_empty() {
        return Err(AppError::invalid_input(format!(
            "'{}' contains no files",
            args.dir.display()
        )));
    }
    debug!(dir = %args.dir.display(), files = files.len(), "Collected local files");

    let mut entries = Vec::with_capacity(files.len());
    for (relative, path) in files {
        let name = file_name(&path)?;
        entries.push((
            format!("{top}/{relative}"),
            FilePayload::new(name, read_bytes(&path).await?),
        ));
    }
    let tree = TreeDescription::from_relative_paths(entries)?;

    let options = options(session, args.mode);
    let cancel = options.cancel.clone();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel));
    let result = session
        .services
        .import
        .import_tree(&session.ctx, args.parent.as_deref(), tree, options)
        .await;
    watcher.abort();

    print_report(&result?, format);
    Ok(())
}

fn options(session: &Session, mode: Option<ModeArg>) -> ImportOptions {
    match mode {
        Some(mode) => ImportOptions::new(mode.into()),
        None => session.services.import.default_options(),
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received; cancelling import");
        cancel.cancel();
    }
}

/// Regular files under `dir` as `(slash-separated relative path, full path)`,
/// sorted by relative path.
async fn collect_files(dir: &Path) -> AppResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![(dir.to_path_buf(), String::new())];

    while let Some((current, prefix)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push((entry.path(), relative));
            } else if file_type.is_file() {
                files.push((relative, entry.path()));
            } else {
                debug!(path = %entry.path().display(), "Skipping non-regular file");
            }
        }
    }

    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> AppResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::invalid_input(format!("'{}' has no usable file name", path.display())))
}

async fn read_bytes(path: &Path) -> AppResult<Bytes> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::InvalidInput,
                format!("Failed to read '{}': {e}", path.display()),
                e,
            )
        })
}

fn print_report(report: &ImportReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = report.created.iter().map(NodeRow::from).collect();
            output::print_list(&rows, format);
            output::print_success(&format!(
                "Imported {} folder(s) and {} file(s), {} into '{}'",
                report.folders,
                report.files,
                output::human_size(report.bytes as i64),
                if report.parent.path.is_empty() { "/" } else { report.parent.path.as_str() }
            ));
        }
    }
}
