//! Embedded schema migrations.
//!
//! Each migration runs in its own transaction together with the row that
//! records it, so a crash mid-migration leaves the schema at the previous
//! version.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} failed: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Cannot read schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
}

/// A schema change compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Every migration, in version order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "cascade engine schema",
    sql: include_str!("../../../migrations/001_initial_schema.sql"),
}];

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the stored version. Returns how many ran.
    pub async fn run(&self, migrations: &[Migration]) -> Result<usize, MigrationError> {
        sqlx::query(VERSION_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|source| MigrationError::ExecutionError { version: 0, source })?;

        let current = self.current_version().await?;
        let mut applied = 0;
        for migration in migrations.iter().filter(|m| m.version > current) {
            self.apply(migration).await?;
            info!(version = migration.version, description = migration.description, "Applied migration");
            applied += 1;
        }
        Ok(applied)
    }

    pub async fn current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;
        Ok(version)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let failed = |source| MigrationError::ExecutionError {
            version: migration.version,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(failed)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_test_pool;

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());

        assert_eq!(migrator.run(MIGRATIONS).await.unwrap(), MIGRATIONS.len());
        assert_eq!(migrator.current_version().await.unwrap(), 1);
        assert_eq!(migrator.run(MIGRATIONS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_schema_creates_cascade_tables() {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone()).run(MIGRATIONS).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        for expected in ["agents", "cascade_entries", "cascades", "clientes", "leads"] {
            assert!(names.iter().any(|n| n == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_failed_migration_leaves_version_unchanged() {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator.run(MIGRATIONS).await.unwrap();

        let broken = [Migration {
            version: 2,
            description: "broken",
            sql: "CREATE TABLE probe (id INTEGER); SELECT * FROM no_such_table;",
        }];
        let err = migrator.run(&broken).await.unwrap_err();
        assert!(matches!(err, MigrationError::ExecutionError { version: 2, .. }));
        assert_eq!(migrator.current_version().await.unwrap(), 1);
    }
}
