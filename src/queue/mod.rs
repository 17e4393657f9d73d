//! Request queue: a deduplicated FIFO of fetch tasks.
//!
//! The crawl core only talks to the `RequestQueue` trait. Two backends ship
//! with the crate: an in-memory queue for one-shot runs and a SQLite queue
//! that survives restarts.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::crawl::FetchRequest;
use crate::error_handling::QueueError;

pub use memory::MemoryRequestQueue;
pub use sqlite::SqliteRequestQueue;

#[async_trait]
pub trait RequestQueue: Send + Sync {
    /// Adds `request` unless its `unique_key` is already known.
    /// Returns whether it was added.
    async fn add_request(&self, request: FetchRequest) -> Result<bool, QueueError>;

    /// Takes the oldest pending request and marks it in progress.
    async fn fetch_next(&self) -> Result<Option<FetchRequest>, QueueError>;

    /// Marks an in-progress request as done. Retries are separate requests
    /// with their own keys, so a retried request is still marked handled.
    async fn mark_handled(&self, request: &FetchRequest) -> Result<(), QueueError>;

    /// True once nothing is pending and nothing is in progress.
    async fn is_finished(&self) -> Result<bool, QueueError>;

    async fn pending_count(&self) -> Result<usize, QueueError>;
}
