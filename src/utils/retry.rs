//! Error retriability for transport retries.

use crate::error_handling::FetchError;

/// Determines if a navigation error is worth retrying within the same session.
///
/// # Retriable Errors
///
/// - Network timeouts, connection and request failures
/// - Server errors (5xx HTTP status codes)
/// - Rate limiting (429 Too Many Requests)
/// - Failures reported by a non-HTTP session driver
///
/// # Non-Retriable Errors
///
/// - Client errors (4xx HTTP status codes, except 429)
/// - Denylisted targets and unparseable URLs
/// - Oversized bodies, redirect loops and decode errors
pub(crate) fn is_retriable_error(error: &FetchError) -> bool {
    match error {
        FetchError::Status { status, .. } => is_retriable_status(*status),
        FetchError::Transport(e) => {
            if let Some(status) = e.status() {
                return is_retriable_status(status.as_u16());
            }
            if e.is_redirect() || e.is_decode() || e.is_builder() {
                return false;
            }
            e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
        }
        FetchError::Driver(_) => true,
        FetchError::Timeout(_)
        | FetchError::Blocked(_)
        | FetchError::InvalidUrl(_)
        | FetchError::BodyTooLarge { .. }
        | FetchError::NoPage => false,
    }
}

fn is_retriable_status(status: u16) -> bool {
    if status == crate::config::HTTP_STATUS_TOO_MANY_REQUESTS {
        return true;
    }
    (500..600).contains(&status)
}

/// Whether a failed request should be re-enqueued at all. Denylisted and
/// malformed targets fail the same way on every attempt.
pub(crate) fn is_requeueable_error(error: &FetchError) -> bool {
    !matches!(error, FetchError::Blocked(_) | FetchError::InvalidUrl(_))
}
