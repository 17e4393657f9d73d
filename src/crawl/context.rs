//! Shared resources for request processing.
//!
//! One `CrawlContext` is built by the orchestrator and cloned into every
//! worker. Nothing in the crawl core reaches for global state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::request::FetchRequest;
use crate::config::Config;
use crate::error_handling::{ErrorType, InfoType, ProcessingStats};
use crate::models::{FailureRecord, OutputRecord};
use crate::queue::RequestQueue;
use crate::session::SessionAcquirer;
use crate::storage::{CrawlStateStore, OutputSink};
use crate::url_builder::UrlParams;

/// Run-wide request counters, read by progress logging and the final report.
#[derive(Debug, Default)]
pub struct CrawlCounters {
    pub handled: AtomicUsize,
    pub failed: AtomicUsize,
    pub emitted: AtomicUsize,
    pub retries: AtomicUsize,
}

impl CrawlCounters {
    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }
}

/// Context containing all shared resources needed by a worker.
#[derive(Clone)]
pub struct CrawlContext {
    pub config: Arc<Config>,
    pub params: Arc<UrlParams>,
    pub queue: Arc<dyn RequestQueue>,
    pub sink: Arc<dyn OutputSink>,
    pub state: Arc<CrawlStateStore>,
    pub sessions: Arc<SessionAcquirer>,
    pub stats: Arc<ProcessingStats>,
    pub counters: Arc<CrawlCounters>,
    /// Set when the process is about to be suspended or moved.
    pub migration: CancellationToken,
}

impl CrawlContext {
    /// Appends records to the sink and counts them.
    pub async fn emit(&self, records: Vec<OutputRecord>) -> Result<()> {
        let count = records.len();
        if count == 0 {
            return Ok(());
        }
        self.sink
            .append_all(records)
            .await
            .context("Failed to append records to the output sink")?;
        self.counters.emitted.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }

    /// Enqueues a link discovered on a page. Known keys are ignored.
    pub async fn enqueue(&self, request: FetchRequest) -> Result<bool> {
        let url = request.url.clone();
        let added = self
            .queue
            .add_request(request)
            .await
            .with_context(|| format!("Failed to enqueue {}", url))?;
        if !added {
            debug!("Already queued: {}", url);
        }
        Ok(added)
    }

    /// Re-enqueues a retry copy. Never fails: a queue error is logged and
    /// reported as `false` so the caller can fall back to a failure record.
    pub async fn requeue(&self, retry: FetchRequest) -> bool {
        let url = retry.url.clone();
        match self.queue.add_request(retry).await {
            Ok(true) => {
                self.stats.increment_info(InfoType::RequestRequeued);
                self.counters.retries.fetch_add(1, Ordering::SeqCst);
                true
            }
            Ok(false) => {
                // The retry key is deterministic, so this copy is already queued.
                debug!("Retry of {} already queued", url);
                true
            }
            Err(e) => {
                warn!("Failed to re-enqueue {}: {}", url, e);
                false
            }
        }
    }

    /// Writes the terminal failure record for `request`.
    pub async fn fail(&self, request: &FetchRequest, errors: Vec<String>) {
        self.stats.increment_error(ErrorType::RetriesExhausted);
        self.counters.failed.fetch_add(1, Ordering::SeqCst);
        warn!(
            "Giving up on {} after {} attempt(s): {}",
            request.url,
            request.attempt() + 1,
            errors.last().map(String::as_str).unwrap_or("unknown error")
        );
        let record = FailureRecord::new(request.url.clone(), errors);
        if let Err(e) = self.sink.append(record.into()).await {
            self.stats.increment_error(ErrorType::SinkError);
            log::error!("Failed to write failure record for {}: {}", request.url, e);
        }
    }
}
