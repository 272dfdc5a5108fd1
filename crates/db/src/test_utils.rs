//! Test utilities for database operations.
//!
//! Provides a migrated, throwaway database for workflow tests. Defaults to
//! in-memory SQLite; set `TEST_DATABASE_URL` to run against `PostgreSQL`.

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// In-memory SQLite URL.
pub const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Connection URL.
    pub url: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("TEST_DATABASE_URL")
                .unwrap_or_else(|_| SQLITE_MEMORY_URL.to_string()),
        }
    }
}

impl TestDbConfig {
    /// Whether this points at an in-memory SQLite database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("sqlite::memory:")
    }
}

/// A migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Create a fresh, fully migrated test database.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Create a test database with custom configuration.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(&config.url);
        // Every in-memory SQLite connection is its own database, so the
        // pool must never hold more than one.
        if config.is_in_memory() {
            opt.max_connections(1).min_connections(1);
        }
        opt.sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!(url = %config.url, "Connected to migrated test database");

        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Roll back every migration (drops all tables).
    pub async fn reset(&self) -> Result<(), DbErr> {
        Migrator::down(&self.conn, None).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_is_sqlite() {
        if std::env::var("TEST_DATABASE_URL").is_err() {
            assert!(TestDbConfig::default().is_in_memory());
        }
    }

    #[tokio::test]
    async fn test_new_database_is_migrated() {
        let db = TestDatabase::with_config(TestDbConfig {
            url: SQLITE_MEMORY_URL.to_string(),
        })
        .await
        .unwrap();

        let applied = Migrator::get_applied_migrations(db.connection())
            .await
            .unwrap();
        assert_eq!(applied.len(), Migrator::migrations().len());
    }
}
