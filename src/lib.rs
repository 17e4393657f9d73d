//! booking_crawler library: hotel search and detail page crawling
//!
//! This library crawls hotel search results and detail pages through rotating,
//! probe-validated proxy sessions and emits hotel, room and pricing records as
//! JSON Lines.
//!
//! # Example
//!
//! ```no_run
//! use booking_crawler::{run_crawl, Config, CrawlInput};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     input: CrawlInput {
//!         search: Some("Lisbon".to_string()),
//!         simple: true,
//!         min_score: Some(8.0),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let report = run_crawl(config).await?;
//! println!("Handled {} requests, emitted {} records",
//!          report.requests_handled, report.records_emitted);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

mod app;
mod cache;
pub mod config;
mod crawl;
mod error_handling;
mod extract;
pub mod initialization;
pub mod models;
mod queue;
mod session;
mod storage;
mod url_builder;
mod utils;

// Re-export public API
pub use config::{Config, CrawlInput, LogFormat, LogLevel, PollPolicy};
pub use error_handling::{ConfigError, StorageError};
pub use run::{run_crawl, run_crawl_into, CrawlReport};
pub use storage::{JsonlSink, MemorySink, OutputSink};

// Internal run module (contains the crawl orchestration)
mod run {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use log::{debug, info, warn};
    use tokio_util::sync::CancellationToken;

    use crate::app::{
        log_progress, print_error_statistics, print_run_summary, shutdown_gracefully,
        spawn_migration_listener,
    };
    use crate::cache::ResponseCache;
    use crate::config::{Config, IDLE_SESSIONS_PER_WORKER, LOGGING_INTERVAL_SECS};
    use crate::crawl::{probe_url, seed_requests, worker_loop, CrawlContext, CrawlCounters};
    use crate::error_handling::ProcessingStats;
    use crate::initialization::ClientSettings;
    use crate::queue::{MemoryRequestQueue, RequestQueue, SqliteRequestQueue};
    use crate::session::{HttpSessionProvider, SessionAcquirer};
    use crate::storage::{CrawlStateStore, JsonlSink, OutputSink};
    use crate::url_builder::UrlParams;

    /// Results of a crawl run.
    #[derive(Debug, Clone)]
    pub struct CrawlReport {
        /// Requests whose page was accepted and handled
        pub requests_handled: usize,
        /// Requests that ended in a failure record
        pub requests_failed: usize,
        /// Records written to the sink, failure records excluded
        pub records_emitted: usize,
        /// Retry copies put back on the queue
        pub retries: usize,
        /// JSONL file the records went to, when the run wrote one
        pub output_path: Option<PathBuf>,
        /// Wall-clock duration of the run
        pub elapsed_seconds: f64,
    }

    /// Runs a crawl and appends its records to the JSON Lines file at
    /// `config.output_path`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration or when the output file,
    /// queue database or session provider cannot be set up. Per-request
    /// failures never abort the run; they end up as failure records.
    pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
        config.validate()?;
        let sink = JsonlSink::open(&config.output_path)
            .await
            .with_context(|| {
                format!("Failed to open output file {}", config.output_path.display())
            })?;
        let output_path = sink.path().to_path_buf();
        let mut report = run_crawl_into(config, Arc::new(sink)).await?;
        report.output_path = Some(output_path);
        Ok(report)
    }

    /// Runs a crawl that writes its records to `sink`.
    ///
    /// # Errors
    ///
    /// Same as [`run_crawl`], minus the output file.
    pub async fn run_crawl_into(config: Config, sink: Arc<dyn OutputSink>) -> Result<CrawlReport> {
        config.validate()?;
        let start_time = std::time::Instant::now();
        let config = Arc::new(config);
        let params = Arc::new(UrlParams::from_input(&config.input));
        let concurrency = config.input.concurrency;

        let stats = Arc::new(ProcessingStats::new());
        let cache = Arc::new(ResponseCache::new(config.input.cache_responses));
        if cache.is_enabled() {
            info!("Response cache enabled");
        }

        let settings = ClientSettings {
            user_agent: config.user_agent.clone(),
            timeout: config.navigation_timeout(),
            accept_language: config.input.language.clone(),
        };
        let proxies = config.input.proxy_config.proxy_urls.clone();
        if proxies.is_empty() {
            info!("No proxies configured, sessions connect directly");
        } else {
            info!("Rotating through {} proxies", proxies.len());
        }
        let provider = HttpSessionProvider::new(
            settings,
            proxies,
            Arc::clone(&cache),
            Arc::clone(&stats),
            config.navigation_timeout(),
        )
        .context("Failed to initialize session provider")?;

        let sessions = Arc::new(SessionAcquirer::new(
            Arc::new(provider),
            probe_url(&config, &params),
            config.input.sort_by.clone(),
            config.input.validate_sessions,
            config.max_session_attempts,
            IDLE_SESSIONS_PER_WORKER * concurrency,
            Arc::clone(&stats),
        ));
        if config.input.validate_sessions {
            info!("Sessions are validated against {}", sessions.probe_url());
        }

        let queue: Arc<dyn RequestQueue> = match &config.queue_db_path {
            Some(path) => {
                info!("Using durable request queue at {}", path.display());
                Arc::new(
                    SqliteRequestQueue::open(path)
                        .await
                        .with_context(|| format!("Failed to open queue database {}", path.display()))?,
                )
            }
            None => Arc::new(MemoryRequestQueue::new()),
        };

        let state = Arc::new(CrawlStateStore::load(&config.state_path));
        if !state.is_empty() {
            info!(
                "Loaded {} already-emitted listing(s) from {}",
                state.len(),
                state.path().display()
            );
        }

        let mut seeded = 0usize;
        for request in seed_requests(&config, &params) {
            if queue
                .add_request(request)
                .await
                .context("Failed to seed the request queue")?
            {
                seeded += 1;
            }
        }
        info!("Seeded {} request(s) with {} worker(s)", seeded, concurrency);

        let migration = CancellationToken::new();
        let signal_listener = spawn_migration_listener(migration.clone());
        let counters = Arc::new(CrawlCounters::default());

        let ctx = CrawlContext {
            config: Arc::clone(&config),
            params,
            queue: Arc::clone(&queue),
            sink,
            state: Arc::clone(&state),
            sessions: Arc::clone(&sessions),
            stats: Arc::clone(&stats),
            counters: Arc::clone(&counters),
            migration,
        };

        let cancel = CancellationToken::new();
        let cancel_logging = cancel.child_token();
        let counters_for_logging = Arc::clone(&counters);
        let queue_for_logging = Arc::clone(&queue);
        let logging_task = tokio::task::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL_SECS));
            // The first tick fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let pending = queue_for_logging.pending_count().await.ok();
                        log_progress(start_time, &counters_for_logging, pending);
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        });

        let mut workers = FuturesUnordered::new();
        for worker_id in 0..concurrency {
            let ctx = ctx.clone();
            workers.push(tokio::spawn(worker_loop(ctx, worker_id)));
        }
        while let Some(worker_result) = workers.next().await {
            if let Err(join_error) = worker_result {
                warn!("Worker panicked: {:?}", join_error);
            }
        }

        shutdown_gracefully(cancel, Some(logging_task), Some(signal_listener)).await;

        if let Err(e) = state.persist().await {
            warn!(
                "Failed to persist crawl state to {}: {}",
                state.path().display(),
                e
            );
        }
        debug!("Closing {} idle session(s)", sessions.idle_count());
        sessions.close_idle().await;

        log_progress(start_time, &counters, queue.pending_count().await.ok());
        let elapsed_seconds = start_time.elapsed().as_secs_f64();
        print_error_statistics(&stats);
        print_run_summary(
            counters.handled(),
            counters.failed(),
            counters.emitted(),
            counters.retries(),
            elapsed_seconds,
        );

        Ok(CrawlReport {
            requests_handled: counters.handled(),
            requests_failed: counters.failed(),
            records_emitted: counters.emitted(),
            retries: counters.retries(),
            output_path: None,
            elapsed_seconds,
        })
    }
}
