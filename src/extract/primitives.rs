//! Tolerant extraction primitives.
//!
//! None of these fail: a missing element, attribute or number is `None`.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::PollPolicy;
use crate::session::BrowserSession;

static INTEGER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern is valid"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Trimmed attribute value; empty values count as absent.
pub fn extract_attribute(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trimmed text content of `element` and its descendants.
pub fn extract_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// First run of ASCII digits in `text`.
pub fn extract_numeric(text: &str) -> Option<u32> {
    INTEGER_RUN
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Text with every whitespace run collapsed to one space, trimmed.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// First element under `scope` matching `selector`.
pub fn select_first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// Text of the first element under `scope` matching `selector`.
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    select_first(scope, selector).and_then(extract_text)
}

/// Attribute of the first element under `scope` matching `selector`.
pub fn first_attribute(scope: ElementRef<'_>, selector: &Selector, name: &str) -> Option<String> {
    select_first(scope, selector).and_then(|e| extract_attribute(e, name))
}

/// Runs `probe` up to `policy.max_attempts` times, sleeping `policy.interval`
/// between attempts, and returns the first non-`None` result.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.max_attempts.max(1) {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    None
}

/// Waits until the session's DOM contains `selector` and returns that snapshot.
pub async fn wait_for_selector(
    session: &dyn BrowserSession,
    selector: &Selector,
    policy: PollPolicy,
) -> Option<String> {
    poll_until(policy, move || async move {
        let html = session.content().await.ok()?;
        let found = Html::parse_document(&html).select(selector).next().is_some();
        found.then_some(html)
    })
    .await
}
