//! Database layer for SQLite storage.
//!
//! This module handles:
//! - Connection pool management with WAL mode
//! - Schema migrations

pub mod pool;

use std::path::Path;
use thiserror::Error;

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Stored value is invalid: {0}")]
    Corrupt(String),
}

/// Ordered list of schema migrations, applied once each.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_initial_schema",
    include_str!("migrations/0001_initial_schema.sql"),
)];

/// Initialize the database: create the file if needed and run migrations.
///
/// # Arguments
/// * `db_path` - Path to the SQLite database file
///
/// # Returns
/// A connection pool configured with WAL mode
pub async fn initialize(db_path: &Path) -> Result<pool::DbPool, DbError> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::Migration(format!("Failed to create database directory: {}", e))
            })?;
        }
    }

    let pool = pool::create_pool(db_path).await?;

    // Bring the schema up to date
    run_migrations(&pool).await?;

    log::info!("Database ready at {}", db_path.display());
    Ok(pool)
}

/// Run all pending database migrations.
///
/// Each migration runs in its own transaction together with its
/// `_migrations` record, so a failed script leaves no trace.
async fn run_migrations(pool: &pool::DbPool) -> Result<(), DbError> {
    // Bookkeeping table listing applied migrations by name
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (name, script) in MIGRATIONS {
        let applied: Option<(i64,)> = sqlx::query_as("SELECT id FROM _migrations WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        if applied.is_some() {
            // Already applied on an earlier start
            continue;
        }

        let mut tx = pool.begin().await?;
        // The script holds several statements; raw_sql runs them in order
        sqlx::raw_sql(script)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("{}: {}", name, e)))?;
        // Record the migration in the same transaction as its statements
        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::info!("Applied migration {}", name);
    }

    Ok(())
}
