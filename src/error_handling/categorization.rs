//! Error categorization and retry strategy.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::stats::ProcessingStats;
use super::types::{ErrorType, FetchError};

/// Creates the exponential backoff used for transport retries inside one navigation.
///
/// Delays are `RETRY_FACTOR_MS * RETRY_BASE^n`, capped at `RETRY_MAX_DELAY_SECS`,
/// and the iterator yields at most `RETRY_MAX_RETRIES` delays.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_BASE)
        .factor(crate::config::RETRY_FACTOR_MS)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_RETRIES)
}

/// Maps a navigation failure onto the statistics bucket it is counted in.
pub fn categorize_fetch_error(error: &FetchError) -> ErrorType {
    match error {
        FetchError::Blocked(_) => ErrorType::BlockedRequest,
        FetchError::Timeout(_) => ErrorType::NavigationTimeout,
        FetchError::Status { .. } => ErrorType::HttpStatusError,
        FetchError::Transport(e) if e.is_timeout() => ErrorType::NavigationTimeout,
        FetchError::Transport(e) if e.status().is_some() => ErrorType::HttpStatusError,
        FetchError::Transport(_)
        | FetchError::InvalidUrl(_)
        | FetchError::BodyTooLarge { .. }
        | FetchError::Driver(_)
        | FetchError::NoPage => ErrorType::NavigationError,
    }
}

/// Records a navigation failure in the statistics.
pub fn update_error_stats(stats: &ProcessingStats, error: &FetchError) {
    stats.increment_error(categorize_fetch_error(error));
}
