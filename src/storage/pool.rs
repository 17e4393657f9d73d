//! Database connection pool management.
//!
//! The queue database is a single SQLite file in WAL mode, created on first
//! use together with its parent directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error_handling::DatabaseError;

/// Concurrent workers contend for the write lock; wait rather than fail.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_CONNECTIONS: u32 = 4;

/// Opens (creating if needed) the SQLite database at `db_path`.
///
/// # Errors
///
/// `DatabaseError::FileCreationError` when the parent directory cannot be
/// created, `DatabaseError::SqlError` when the database cannot be opened.
pub async fn init_db_pool_with_path(db_path: &Path) -> Result<Arc<Pool<Sqlite>>, DatabaseError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| DatabaseError::FileCreationError(e.to_string()))?;
    }

    let db_path_str = db_path.to_string_lossy();
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!("Failed to open queue database {}: {e}", db_path_str);
            DatabaseError::SqlError(e)
        })?;
    debug!("Queue database {} opened", db_path_str);

    Ok(Arc::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_file_and_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("queue.db");
        let pool = init_db_pool_with_path(&path).await.unwrap();
        assert!(path.exists());

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(pool.as_ref())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
