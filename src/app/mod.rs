//! Main application modules.
//!
//! This module provides progress logging, migration and shutdown handling,
//! and statistics printing used by the crawl orchestrator.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::log_progress;
pub use shutdown::{shutdown_gracefully, spawn_migration_listener};
pub use statistics::{print_error_statistics, print_run_summary};
