//! SQLite connection pool with WAL mode.
//!
//! Readers proceed concurrently with a writer under WAL. Store transactions
//! take the write lock up front (`BEGIN IMMEDIATE`), so concurrent writers
//! queue on the busy timeout instead of failing on lock upgrade.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<Sqlite>;

/// How long a writer waits for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a new connection pool with WAL mode and foreign keys enabled.
///
/// The database file is created if missing; its parent directory must exist.
pub async fn create_pool(db_path: &Path) -> Result<DbPool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        // Create the database file if it doesn't exist
        .create_if_missing(true)
        // WAL lets reads run alongside the single writer
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL is durable enough under WAL
        .synchronous(SqliteSynchronous::Normal)
        // Users, pull requests and assignments reference each other
        .foreign_keys(true)
        // Queued writers wait this long for the write lock
        .busy_timeout(BUSY_TIMEOUT)
        // Checkpoint every 1000 pages (~4MB) so the WAL stays small
        .pragma("wal_autocheckpoint", "1000");

    let pool = SqlitePoolOptions::new()
        // Writers are serialized anyway; extra connections only serve readers
        .max_connections(8)
        // Keep one connection warm
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await?;

    // Confirm WAL took effect; some filesystems refuse it
    let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await?;
    log::debug!("SQLite journal mode: {}", mode.0);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_pool_with_wal() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let pool = create_pool(&db_path).await.unwrap();

        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.0.to_lowercase(), "wal");

        let fk: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fk.0, 1);
    }

    #[tokio::test]
    async fn test_pool_requires_parent_directory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("subdir/test.db");

        // create_if_missing only creates the file, not directories
        assert!(create_pool(&db_path).await.is_err());

        std::fs::create_dir_all(db_path.parent().unwrap()).unwrap();
        let pool = create_pool(&db_path).await.unwrap();
        assert!(db_path.exists());

        let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(result.0, 1);
    }
}
