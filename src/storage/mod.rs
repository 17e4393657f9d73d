// storage/mod.rs
// Persistence: queue database, crawl-state file and output sinks

pub mod migrations;
pub mod pool;
pub mod sink;
pub mod state;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
pub use sink::{JsonlSink, MemorySink, OutputSink};
pub use state::CrawlStateStore;
