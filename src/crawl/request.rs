//! Queued fetch tasks.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Which handler a fetched page goes to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Label {
    /// Seed search-results page.
    Start,
    /// Pagination page of a search.
    Page,
    /// Hotel detail page.
    Detail,
    /// Search-results page with one filter applied.
    FilterPage,
}

impl Label {
    pub fn is_listing(self) -> bool {
        !matches!(self, Label::Detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub label: Label,
}

/// One logical fetch task.
///
/// `unique_key` is the queue's dedup identity. Retried copies get a key derived
/// from `(origin_key, attempt)` so the queue does not swallow them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub url: String,
    pub unique_key: String,
    pub user_data: UserData,
    /// Key of the first copy of this task.
    pub origin_key: String,
    /// Navigation failures so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Retire-and-requeue cycles caused by an invalid session.
    #[serde(default)]
    pub session_retries: u32,
    #[serde(default)]
    pub error_messages: Vec<String>,
}

impl FetchRequest {
    /// A request keyed by its URL.
    pub fn new(url: impl Into<String>, label: Label) -> Self {
        let url = url.into();
        Self::with_key(url.clone(), label, url)
    }

    pub fn with_key(url: impl Into<String>, label: Label, unique_key: impl Into<String>) -> Self {
        let unique_key = unique_key.into();
        Self {
            url: url.into(),
            origin_key: unique_key.clone(),
            unique_key,
            user_data: UserData { label },
            retry_count: 0,
            session_retries: 0,
            error_messages: Vec::new(),
        }
    }

    pub fn label(&self) -> Label {
        self.user_data.label
    }

    /// Total times this task has been re-enqueued.
    pub fn attempt(&self) -> u32 {
        self.retry_count + self.session_retries
    }

    fn rekeyed(mut self) -> Self {
        self.unique_key = format!("{}#retry{}", self.origin_key, self.attempt());
        self
    }

    /// Copy to re-enqueue after the page came back through an unusable session.
    pub fn retry_after_invalid_session(&self) -> Self {
        let mut next = self.clone();
        next.session_retries += 1;
        next.rekeyed()
    }

    /// Copy to re-enqueue after a navigation failure.
    pub fn retry_after_failure(&self, error: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.retry_count += 1;
        next.error_messages.push(error.into());
        next.rekeyed()
    }
}
