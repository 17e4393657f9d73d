//! Static denylist of asset and tracker targets.
//!
//! Matching targets are never fetched, cached or not.

const DENYLIST: &[&str] = &[
    ".js",
    ".png",
    ".jpg",
    ".gif",
    ".css",
    "static/fonts",
    "js_tracking",
    "facebook.com",
    "googleapis.com",
    "secure.booking.com",
    "booking.com/logo",
    "booking.com/navigation_times",
];

/// Returns the denylist pattern `url` matches, if any.
pub fn blocked_by(url: &str) -> Option<&'static str> {
    DENYLIST.iter().copied().find(|pattern| url.contains(pattern))
}
