//! Initial requests and the session probe URL.

use std::str::FromStr;

use log::warn;

use super::request::{FetchRequest, Label};
use crate::config::{Config, Seed, PROBE_DESTINATION};
use crate::url_builder::{build_url, search_url, with_offset, with_rows, UrlParams};

/// Search-results URL the run starts from (search mode only).
pub fn start_url(config: &Config, params: &UrlParams) -> Option<String> {
    match config.seed() {
        Seed::Search(query) => Some(with_rows(
            &search_url(&config.base_url, query, &config.input.sort_by, params),
            config.page_size,
        )),
        Seed::StartUrls(_) => None,
    }
}

/// URL a fresh session is sent to before use. Its resolved URL must carry
/// the requested sort key.
pub fn probe_url(config: &Config, params: &UrlParams) -> String {
    start_url(config, params).unwrap_or_else(|| {
        search_url(
            &config.base_url,
            PROBE_DESTINATION,
            &config.input.sort_by,
            params,
        )
    })
}

fn start_url_label(url: &str, explicit: Option<&str>) -> Label {
    if let Some(raw) = explicit {
        match Label::from_str(raw) {
            Ok(label) => return label,
            Err(_) => warn!("Unknown label '{}' for start URL {}, inferring one", raw, url),
        }
    }
    if url.contains("/hotel/") {
        Label::Detail
    } else {
        Label::Start
    }
}

/// Requests enqueued before the first worker starts.
///
/// Search mode seeds one `start` request. With `maxPages` and no filters the
/// remaining result pages are seeded too, and dynamic pagination is skipped.
pub fn seed_requests(config: &Config, params: &UrlParams) -> Vec<FetchRequest> {
    match config.seed() {
        Seed::Search(_) => {
            let Some(start) = start_url(config, params) else {
                return Vec::new();
            };
            let mut requests = vec![FetchRequest::new(start.clone(), Label::Start)];
            if let (false, Some(max_pages)) = (config.input.use_filters, config.input.max_pages) {
                for page in 1..max_pages {
                    let url = with_offset(&start, config.page_size, config.page_size * page);
                    requests.push(FetchRequest::new(url, Label::Page));
                }
            }
            requests
        }
        Seed::StartUrls(urls) => urls
            .iter()
            .map(|start| {
                let url = build_url(start.url().trim(), params);
                let label = start_url_label(&url, start.label());
                FetchRequest::new(url, label)
            })
            .collect(),
    }
}

/// Whether pagination pages were already seeded up front.
pub fn pages_preseeded(config: &Config) -> bool {
    matches!(config.seed(), Seed::Search(_))
        && !config.input.use_filters
        && config.input.max_pages.is_some()
}
