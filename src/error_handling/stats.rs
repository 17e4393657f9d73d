//! Crawl statistics tracking.
//!
//! Thread-safe counters for errors, warnings, and informational events raised
//! while requests are crawled.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{ErrorType, InfoType, WarningType};

/// One atomic counter per variant of `K`, all created up front so increments
/// never need a lock.
struct CounterMap<K: Eq + Hash> {
    counters: HashMap<K, AtomicUsize>,
}

impl<K> CounterMap<K>
where
    K: IntoEnumIterator + Eq + Hash + Copy + std::fmt::Debug,
{
    fn new() -> Self {
        Self {
            counters: K::iter().map(|k| (k, AtomicUsize::new(0))).collect(),
        }
    }

    fn increment(&self, key: K) {
        match self.counters.get(&key) {
            Some(counter) => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            None => log::error!("No counter registered for {:?}", key),
        }
    }

    fn get(&self, key: K) -> usize {
        self.counters
            .get(&key)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn total(&self) -> usize {
        K::iter().map(|k| self.get(k)).sum()
    }
}

/// Thread-safe crawl statistics tracker.
///
/// # Categories
///
/// - **Errors**: Failures that end or retry a request
/// - **Warnings**: Missing page data (unrendered price, absent structured data)
/// - **Info**: Session, cache and emission events
///
/// Shared across workers behind an `Arc`.
pub struct ProcessingStats {
    errors: CounterMap<ErrorType>,
    warnings: CounterMap<WarningType>,
    info: CounterMap<InfoType>,
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStats {
    pub fn new() -> Self {
        ProcessingStats {
            errors: CounterMap::new(),
            warnings: CounterMap::new(),
            info: CounterMap::new(),
        }
    }

    pub fn increment_error(&self, error: ErrorType) {
        self.errors.increment(error);
    }

    pub fn increment_warning(&self, warning: WarningType) {
        self.warnings.increment(warning);
    }

    pub fn increment_info(&self, info_type: InfoType) {
        self.info.increment(info_type);
    }

    pub fn get_error_count(&self, error: ErrorType) -> usize {
        self.errors.get(error)
    }

    pub fn get_warning_count(&self, warning: WarningType) -> usize {
        self.warnings.get(warning)
    }

    pub fn get_info_count(&self, info_type: InfoType) -> usize {
        self.info.get(info_type)
    }

    pub fn total_errors(&self) -> usize {
        self.errors.total()
    }

    pub fn total_warnings(&self) -> usize {
        self.warnings.total()
    }

    pub fn total_info(&self) -> usize {
        self.info.total()
    }
}
