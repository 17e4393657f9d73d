//! In-process response cache with origin-driven TTL.
//!
//! Entries are keyed by absolute URL and expire lazily: `get` treats an
//! expired entry as absent and drops it. There is no background sweep.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;

static MAX_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max-age=(\d+)").expect("max-age pattern is valid"));

/// A stored HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// URL the server ended on after redirects.
    pub final_url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: CachedResponse,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Extracts `max-age` (seconds) from a `Cache-Control` header value.
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    MAX_AGE
        .captures(cache_control)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Shared response cache. Disabled caches accept `put` calls and ignore them.
#[derive(Debug, Default)]
pub struct ResponseCache {
    enabled: bool,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the entry for `url` while it is fresh.
    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match entries.get(url) {
            Some(entry) if entry.is_fresh(Instant::now()) => Some(entry.response.clone()),
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    /// Stores `response` for `ttl`. A zero TTL stores nothing.
    pub fn put(&self, url: &str, response: CachedResponse, ttl: Duration) {
        if !self.enabled || ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            response,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A live entry is never replaced; only missing or stale ones are.
        match entries.get(url) {
            Some(existing) if existing.is_fresh(Instant::now()) => {}
            _ => {
                entries.insert(url.to_string(), entry);
            }
        }
    }

    /// Stores `response` if its `Cache-Control` header declares a positive max-age.
    pub fn put_if_cacheable(&self, url: &str, response: CachedResponse) -> bool {
        let max_age = response
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("cache-control"))
            .and_then(|(_, value)| parse_max_age(value))
            .unwrap_or(0);
        if max_age == 0 || !self.enabled {
            return false;
        }
        self.put(url, response, Duration::from_secs(max_age));
        true
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(cache_control: Option<&str>) -> CachedResponse {
        CachedResponse {
            final_url: "https://x.test/a".to_string(),
            status: 200,
            headers: cache_control
                .map(|v| vec![("Cache-Control".to_string(), v.to_string())])
                .unwrap_or_default(),
            body: "<html></html>".to_string(),
        }
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("public, max-age=300"), Some(300));
        assert_eq!(parse_max_age("max-age=0"), Some(0));
        assert_eq!(parse_max_age("no-store"), None);
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let cache = ResponseCache::new(true);
        let url = "https://www.booking.com/searchresults.html?ss=Paris";
        cache.put(url, response(None), Duration::from_secs(60));
        assert_eq!(cache.get(url), Some(response(None)));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = ResponseCache::new(true);
        let url = "https://x.test/a";
        cache.put(url, response(None), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(url), None);
        assert!(cache.is_empty(), "expired entry should be dropped on read");
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ResponseCache::new(false);
        cache.put("https://x.test/a", response(None), Duration::from_secs(60));
        assert!(cache.is_empty());
        assert_eq!(cache.get("https://x.test/a"), None);
    }

    #[test]
    fn test_put_if_cacheable_requires_positive_max_age() {
        let cache = ResponseCache::new(true);
        assert!(!cache.put_if_cacheable("https://x.test/none", response(None)));
        assert!(!cache.put_if_cacheable("https://x.test/zero", response(Some("max-age=0"))));
        assert!(cache.put_if_cacheable("https://x.test/ok", response(Some("max-age=120"))));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("https://x.test/ok").is_some());
    }

    #[test]
    fn test_fresh_entry_is_not_replaced() {
        let cache = ResponseCache::new(true);
        let url = "https://x.test/a";
        cache.put(url, response(None), Duration::from_secs(60));
        let mut other = response(None);
        other.body = "changed".to_string();
        cache.put(url, other, Duration::from_secs(60));
        assert_eq!(cache.get(url).map(|r| r.body), Some("<html></html>".to_string()));
    }
}
