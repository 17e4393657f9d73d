//! Configuration constants (used as defaults).

use std::time::Duration;

/// Origin every generated search and probe URL points at.
pub const DEFAULT_BASE_URL: &str = "https://www.booking.com";

/// Sort key requested on search pages. Its presence in the resolved URL is the
/// validity marker for listing pages and session probes.
pub const DEFAULT_SORT_BY: &str = "bayesian_review_score";

/// Destination used for the probe URL when the run is seeded from explicit start URLs.
pub const PROBE_DESTINATION: &str = "paris";

/// Query parameter the origin keeps on detail links served to a legitimate session.
pub const DETAIL_VALIDITY_MARKER: &str = "label";

/// Number of result cards the site renders per listing page.
pub const PAGE_SIZE: u32 = 20;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Upper bound for proxy probing. Large enough to tolerate a noisy pool, never infinite.
pub const MAX_SESSION_ATTEMPTS: u32 = 1000;

/// Navigation failures tolerated per request before a failure record is written.
pub const MAX_REQUEST_RETRIES: u32 = 3;

/// Retire-and-requeue cycles tolerated per logical task.
pub const MAX_SESSION_RETRIES: u32 = 10;

/// Idle validated sessions kept for reuse, per worker.
pub const IDLE_SESSIONS_PER_WORKER: usize = 1;

pub const NAVIGATION_TIMEOUT_SECS: u64 = 60;
pub const REQUEST_TIMEOUT_SECS: u64 = 200;

/// Interval between DOM snapshots while waiting for asynchronously rendered content.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Snapshots taken before giving up on asynchronously rendered content.
pub const POLL_MAX_ATTEMPTS: u32 = 10;

/// Seconds between progress log lines.
pub const LOGGING_INTERVAL_SECS: u64 = 5;
/// Pause before re-checking an empty queue that still has requests in flight.
pub const QUEUE_IDLE_WAIT: Duration = Duration::from_millis(200);
/// A worker stops after this many queue read failures in a row.
pub const MAX_CONSECUTIVE_QUEUE_ERRORS: u32 = 10;

pub const DEFAULT_OUTPUT_PATH: &str = "./hotels.jsonl";
pub const DEFAULT_STATE_PATH: &str = "./crawl_state.json";

/// Default User-Agent string for HTTP sessions.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Transport retry strategy (within a single navigation)
/// Exponent base of the backoff; delays are `RETRY_FACTOR_MS * RETRY_BASE^n`
pub const RETRY_BASE: u64 = 2;
/// Multiplier in milliseconds (first delay 500ms, then 1s, 2s, ...)
pub const RETRY_FACTOR_MS: u64 = 250;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 10;
/// Transport retries per navigation (not counting the initial attempt)
pub const RETRY_MAX_RETRIES: usize = 2;

pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Maximum response body size in bytes (8MB). Detail pages are large but never this large.
pub const MAX_RESPONSE_BODY_SIZE: usize = 8 * 1024 * 1024;
