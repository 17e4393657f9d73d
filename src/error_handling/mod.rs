//! Error handling and crawl statistics.
//!
//! This module provides:
//! - Error type definitions per layer (configuration, fetch, session, queue, storage)
//! - Crawl statistics tracking (errors, warnings, info metrics)
//! - Transport retry strategy
//!
//! Only `ConfigError` is fatal to a run; every other error is contained to the
//! request that raised it.

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{get_retry_strategy, update_error_stats};
pub use stats::ProcessingStats;
pub use types::{
    ConfigError, DatabaseError, ErrorType, FetchError, InfoType, InitializationError,
    QueueError, SessionError, StorageError, WarningType,
};
