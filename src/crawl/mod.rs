//! Crawl orchestration: seeding, routing, page handlers and workers.

mod context;
mod detail;
mod listing;
mod request;
mod router;
mod seed;
mod worker;

pub use context::{CrawlContext, CrawlCounters};
pub use request::{FetchRequest, Label};
pub use seed::{probe_url, seed_requests};
pub use worker::worker_loop;
