//! HTTP client initialization.
//!
//! Each session gets its own `reqwest::Client` so cookies and the proxy
//! identity never leak between sessions.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::ClientBuilder;

use crate::error_handling::InitializationError;

/// Settings shared by every session client of a run.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub accept_language: Option<String>,
}

/// Initializes the HTTP client for one session.
///
/// Creates a `reqwest::Client` configured with:
/// - Cookie store (sessions keep the cookies the origin hands out)
/// - Browser-like User-Agent and Accept headers
/// - Timeout from settings
/// - Redirect following enabled (reqwest default, up to 10 hops)
/// - The given proxy for all schemes, or a direct connection
///
/// # Errors
///
/// Returns `InitializationError::ProxyUrlError` if the proxy URL is unusable
/// and `InitializationError::HttpClientError` if client creation fails.
pub fn init_session_client(
    settings: &ClientSettings,
    proxy_url: Option<&str>,
) -> Result<reqwest::Client, InitializationError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Some(lang) = settings
        .accept_language
        .as_deref()
        .and_then(|l| HeaderValue::from_str(l).ok())
    {
        headers.insert(ACCEPT_LANGUAGE, lang);
    }

    let mut builder = ClientBuilder::new()
        .cookie_store(true)
        .default_headers(headers)
        .timeout(settings.timeout)
        .user_agent(settings.user_agent.clone());

    if let Some(proxy_url) = proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|_| InitializationError::ProxyUrlError(redact_proxy(proxy_url)))?;
        builder = builder.proxy(proxy);
    } else {
        builder = builder.no_proxy();
    }

    Ok(builder.build()?)
}

/// Proxy URL without credentials, safe to log.
pub fn redact_proxy(proxy_url: &str) -> String {
    match url::Url::parse(proxy_url) {
        Ok(u) => match (u.host_str(), u.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", u.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", u.scheme(), host),
            _ => "<invalid proxy>".to_string(),
        },
        Err(_) => "<invalid proxy>".to_string(),
    }
}
