//! Progress logging utilities.

use log::info;

use crate::crawl::CrawlCounters;

/// Logs progress information about request processing.
///
/// # Arguments
///
/// * `start_time` - The start time of the crawl
/// * `counters` - Run-wide request counters
/// * `pending` - Requests still waiting in the queue, when known
pub fn log_progress(start_time: std::time::Instant, counters: &CrawlCounters, pending: Option<usize>) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let handled = counters.handled();
    let rate = if elapsed_secs > 0.0 {
        handled as f64 / elapsed_secs
    } else {
        0.0
    };
    let pending = pending.map_or_else(|| "?".to_string(), |p| p.to_string());
    info!(
        "Handled {} requests ({} failed, {} records, {} pending) in {:.2} seconds (~{:.2} req/sec)",
        handled,
        counters.failed(),
        counters.emitted(),
        pending,
        elapsed_secs,
        rate
    );
}
