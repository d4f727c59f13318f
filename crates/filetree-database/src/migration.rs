//! Schema migrations embedded from the workspace `migrations/` directory.

use std::collections::HashSet;

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use tracing::info;

use filetree_core::error::{AppError, ErrorKind};
use filetree_core::result::AppResult;

use crate::error::db_error;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// A migration known to the binary but not yet recorded in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    /// Timestamp version from the file name.
    pub version: i64,
    /// Description from the file name.
    pub description: String,
}

/// Apply every pending migration.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR.run(pool).await.map_err(|e| match e {
        MigrateError::Execute(inner) => db_error("Failed to run migrations", inner),
        other => AppError::with_source(
            ErrorKind::Consistency,
            format!("Failed to run migrations: {other}"),
            other,
        ),
    })?;
    info!("Database schema is up to date");
    Ok(())
}

/// Embedded migrations whose version the database has not recorded as
/// successfully applied.
pub async fn pending_migrations(pool: &PgPool) -> AppResult<Vec<PendingMigration>> {
    let tracked: bool = sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await
        .map_err(|e| db_error("Failed to inspect migration history", e))?;
    let applied: HashSet<i64> = if tracked {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Failed to read migration history", e))?
            .into_iter()
            .collect()
    } else {
        HashSet::new()
    };
    Ok(unapplied(&applied))
}

fn unapplied(applied: &HashSet<i64>) -> Vec<PendingMigration> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .map(|m| PendingMigration {
            version: m.version,
            description: m.description.to_string(),
        })
        .collect()
}
