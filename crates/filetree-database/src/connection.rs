//! Opening the PostgreSQL pool behind [`PgNodeRepository`](crate::PgNodeRepository).

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use filetree_core::config::DatabaseConfig;
use filetree_core::result::AppResult;

use crate::error::db_error;
use crate::migration::{self, PendingMigration};

/// A connected pool plus the schema operations run against it.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open a pool sized and timed by `config`.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );
        let pool = pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;
        Ok(Self { pool })
    }

    /// Hand the pool to a repository.
    pub fn into_pool(self) -> PgPool {
        self.pool
    }

    /// Apply every pending migration and return what was applied.
    pub async fn migrate(&self) -> AppResult<Vec<PendingMigration>> {
        let pending = migration::pending_migrations(&self.pool).await?;
        migration::run_migrations(&self.pool).await?;
        Ok(pending)
    }

    /// Migrations not yet applied to this database.
    pub async fn pending_migrations(&self) -> AppResult<Vec<PendingMigration>> {
        migration::pending_migrations(&self.pool).await
    }

    /// Wait for every connection to close.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

/// The URL with any password in its userinfo replaced by `****`.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let Some((userinfo, host)) = authority.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}{tail}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_hides_only_the_password() {
        assert_eq!(
            redact_url("postgres://filetree:s3cr@t@db:5432/filetree"),
            "postgres://filetree:****@db:5432/filetree"
        );
        assert_eq!(redact_url("postgres://filetree@db/filetree"), "postgres://filetree@db/filetree");
        assert_eq!(redact_url("postgres://db/a@b"), "postgres://db/a@b");
        assert_eq!(redact_url("not a url"), "not a url");
    }

    #[test]
    fn test_pool_options_follow_config() {
        let config = DatabaseConfig {
            max_connections: 7,
            min_connections: 2,
            connect_timeout_seconds: 3,
            idle_timeout_seconds: 60,
            ..DatabaseConfig::default()
        };
        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_min_connections(), 2);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(3));
        assert_eq!(options.get_idle_timeout(), Some(Duration::from_secs(60)));
    }
}
