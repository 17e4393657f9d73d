//! SQLite-backed request queue.
//!
//! Rows move `pending -> in_progress -> handled`. Opening an existing queue
//! puts rows left `in_progress` by an interrupted run back to `pending`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use sqlx::{Pool, Row, Sqlite};

use super::RequestQueue;
use crate::crawl::FetchRequest;
use crate::error_handling::QueueError;
use crate::storage::{init_db_pool_with_path, run_migrations};

pub struct SqliteRequestQueue {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteRequestQueue {
    /// Opens (creating if needed) the queue database at `path`.
    pub async fn open(path: &Path) -> Result<Self, QueueError> {
        let pool = init_db_pool_with_path(path).await?;
        run_migrations(&pool).await?;

        let reset = sqlx::query("UPDATE request_queue SET state = 'pending' WHERE state = 'in_progress'")
            .execute(pool.as_ref())
            .await?;
        if reset.rows_affected() > 0 {
            info!(
                "Resumed {} interrupted request(s) from {}",
                reset.rows_affected(),
                path.display()
            );
        }
        Ok(Self { pool })
    }

    async fn count_in(&self, states: &str) -> Result<usize, QueueError> {
        let sql = format!("SELECT COUNT(*) FROM request_queue WHERE state IN ({states})");
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(self.pool.as_ref()).await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl RequestQueue for SqliteRequestQueue {
    async fn add_request(&self, request: FetchRequest) -> Result<bool, QueueError> {
        let payload = serde_json::to_string(&request)?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO request_queue (unique_key, url, label, payload, enqueued_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.unique_key)
        .bind(&request.url)
        .bind(request.label().as_ref())
        .bind(payload)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn fetch_next(&self) -> Result<Option<FetchRequest>, QueueError> {
        // One statement, so two workers can never claim the same row.
        let row = sqlx::query(
            "UPDATE request_queue SET state = 'in_progress' \
             WHERE id = (SELECT id FROM request_queue WHERE state = 'pending' ORDER BY id LIMIT 1) \
             RETURNING payload",
        )
        .fetch_optional(self.pool.as_ref())
        .await?;
        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    async fn mark_handled(&self, request: &FetchRequest) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE request_queue SET state = 'handled', handled_at = ? WHERE unique_key = ?",
        )
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(&request.unique_key)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn is_finished(&self) -> Result<bool, QueueError> {
        Ok(self.count_in("'pending', 'in_progress'").await? == 0)
    }

    async fn pending_count(&self) -> Result<usize, QueueError> {
        self.count_in("'pending'").await
    }
}
