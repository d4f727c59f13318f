//! Database migration command.

use clap::Args;

use crate::output;
use filetree_core::config::{AppConfig, DatabaseBackend};
use filetree_core::result::AppResult;
use filetree_database::{DatabasePool, PendingMigration};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// List pending migrations without applying them
    #[arg(long)]
    pub dry_run: bool,
}

/// Apply pending migrations to the configured database.
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> AppResult<()> {
    if config.database.backend == DatabaseBackend::Memory {
        output::print_warning("The memory backend has no schema; nothing to migrate.");
        return Ok(());
    }

    let pool = DatabasePool::connect(&config.database).await?;
    let result = if args.dry_run {
        pool.pending_migrations().await.map(|pending| {
            print_migrations(&pending);
            output::print_success(&format!("{} migration(s) pending (dry run).", pending.len()));
        })
    } else {
        pool.migrate().await.map(|applied| {
            print_migrations(&applied);
            output::print_success(&format!("{} migration(s) applied.", applied.len()));
        })
    };
    pool.close().await;
    result
}

fn print_migrations(migrations: &[PendingMigration]) {
    for migration in migrations {
        output::print_kv(&migration.version.to_string(), &migration.description);
    }
}
