//! Plain-HTTP session driver.
//!
//! One `reqwest` client per session: its own cookie jar and its own proxy.
//! Navigation applies the denylist, then the response cache (skipped by
//! `goto_uncached`), then fetches with transport retry inside the navigation
//! timeout. Cache entries remember the URL the server ended on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use rand::Rng;
use tokio_retry::RetryIf;

use super::{denylist, BrowserSession, SessionProvider};
use crate::cache::{CachedResponse, ResponseCache};
use crate::config::MAX_RESPONSE_BODY_SIZE;
use crate::error_handling::{
    get_retry_strategy, FetchError, InfoType, InitializationError, ProcessingStats, SessionError,
};
use crate::initialization::{init_session_client, redact_proxy, ClientSettings};
use crate::utils::is_retriable_error;

/// Hands out HTTP sessions, rotating through the configured proxies.
pub struct HttpSessionProvider {
    settings: ClientSettings,
    proxies: Vec<String>,
    next: AtomicUsize,
    cache: Arc<ResponseCache>,
    stats: Arc<ProcessingStats>,
    navigation_timeout: Duration,
}

impl HttpSessionProvider {
    /// # Errors
    ///
    /// Returns `InitializationError::ProxyUrlError` for the first proxy URL
    /// that cannot be used.
    pub fn new(
        settings: ClientSettings,
        proxies: Vec<String>,
        cache: Arc<ResponseCache>,
        stats: Arc<ProcessingStats>,
        navigation_timeout: Duration,
    ) -> Result<Self, InitializationError> {
        for proxy in &proxies {
            reqwest::Proxy::all(proxy.as_str())
                .map_err(|_| InitializationError::ProxyUrlError(redact_proxy(proxy)))?;
        }
        // Start at a random proxy so parallel runs do not all hit the first one.
        let start = if proxies.is_empty() {
            0
        } else {
            rand::rng().random_range(0..proxies.len())
        };
        Ok(Self {
            settings,
            proxies,
            next: AtomicUsize::new(start),
            cache,
            stats,
            navigation_timeout,
        })
    }

    fn next_proxy(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[i].as_str())
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let proxy = self.next_proxy();
        let client = init_session_client(&self.settings, proxy)
            .map_err(|e| SessionError::Provider(e.to_string()))?;
        let identity = proxy.map(redact_proxy).unwrap_or_else(|| "direct".to_string());
        trace!("Opened HTTP session via {}", identity);
        Ok(Box::new(HttpSession {
            client,
            identity,
            cache: Arc::clone(&self.cache),
            stats: Arc::clone(&self.stats),
            navigation_timeout: self.navigation_timeout,
            current_url: None,
            body: None,
        }))
    }
}

pub struct HttpSession {
    client: reqwest::Client,
    identity: String,
    cache: Arc<ResponseCache>,
    stats: Arc<ProcessingStats>,
    navigation_timeout: Duration,
    current_url: Option<String>,
    body: Option<String>,
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<CachedResponse, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let final_url = response.url().to_string();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: final_url,
            status: status.as_u16(),
        });
    }
    if let Some(len) = response.content_length() {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > MAX_RESPONSE_BODY_SIZE {
            return Err(FetchError::BodyTooLarge {
                url: final_url,
                size: len,
            });
        }
    }
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response.text().await?;
    if body.len() > MAX_RESPONSE_BODY_SIZE {
        return Err(FetchError::BodyTooLarge {
            url: final_url,
            size: body.len(),
        });
    }
    Ok(CachedResponse {
        final_url,
        status: status.as_u16(),
        headers,
        body,
    })
}

impl HttpSession {
    async fn navigate(&mut self, url: &str, use_cache: bool) -> Result<(), FetchError> {
        if let Some(pattern) = denylist::blocked_by(url) {
            debug!("Not fetching {} (matches '{}')", url, pattern);
            return Err(FetchError::Blocked(url.to_string()));
        }
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        if use_cache {
            if let Some(cached) = self.cache.get(url) {
                self.stats.increment_info(InfoType::CacheHit);
                self.current_url = Some(cached.final_url);
                self.body = Some(cached.body);
                return Ok(());
            }
        }

        let client = &self.client;
        let fetch = RetryIf::spawn(
            get_retry_strategy(),
            || fetch_once(client, url),
            |e: &FetchError| is_retriable_error(e),
        );
        let response = tokio::time::timeout(self.navigation_timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout(self.navigation_timeout))??;

        // Keyed by the requested URL; a hit replays where the server sent us.
        if self.cache.is_enabled() {
            self.cache.put_if_cacheable(url, response.clone());
        }
        self.current_url = Some(response.final_url);
        self.body = Some(response.body);
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    fn proxy_identity(&self) -> &str {
        &self.identity
    }

    async fn goto(&mut self, url: &str) -> Result<(), FetchError> {
        self.navigate(url, true).await
    }

    async fn goto_uncached(&mut self, url: &str) -> Result<(), FetchError> {
        self.navigate(url, false).await
    }

    fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    async fn content(&self) -> Result<String, FetchError> {
        self.body.clone().ok_or(FetchError::NoPage)
    }

    async fn close(&mut self) {
        self.current_url = None;
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(cache: bool) -> HttpSessionProvider {
        HttpSessionProvider::new(
            ClientSettings {
                user_agent: "test-agent".into(),
                timeout: Duration::from_secs(5),
                accept_language: None,
            },
            vec![],
            Arc::new(ResponseCache::new(cache)),
            Arc::new(ProcessingStats::new()),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_goto_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/searchresults.html"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "/blocked.html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blocked.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("captcha"))
            .mount(&server)
            .await;

        let mut session = provider(false).open().await.unwrap();
        assert_eq!(session.proxy_identity(), "direct");
        session
            .goto(&format!("{}/searchresults.html?order=x", server.uri()))
            .await
            .unwrap();
        assert_eq!(
            session.current_url(),
            Some(format!("{}/blocked.html", server.uri()).as_str())
        );
        assert_eq!(session.content().await.unwrap(), "captcha");
    }

    #[tokio::test]
    async fn test_goto_rejects_denylisted_targets() {
        let mut session = provider(false).open().await.unwrap();
        let err = session
            .goto("https://www.facebook.com/tr?id=1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Blocked(_)));
        assert!(matches!(session.content().await, Err(FetchError::NoPage)));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.html"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = provider(false).open().await.unwrap();
        let err = session
            .goto(&format!("{}/gone.html", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_cacheable_response_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hotel/fr/a.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Cache-Control", "public, max-age=600")
                    .set_body_string("<html>hotel</html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(true);
        let url = format!("{}/hotel/fr/a.html", server.uri());
        let mut first = provider.open().await.unwrap();
        first.goto(&url).await.unwrap();
        let mut second = provider.open().await.unwrap();
        second.goto(&url).await.unwrap();
        assert_eq!(second.content().await.unwrap(), "<html>hotel</html>");
        assert_eq!(provider.stats.get_info_count(InfoType::CacheHit), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_replays_redirect_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hotel/fr/old.html"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/hotel/fr/new.html"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hotel/fr/new.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Cache-Control", "max-age=600")
                    .set_body_string("<html>moved</html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(true);
        let url = format!("{}/hotel/fr/old.html", server.uri());
        let target = format!("{}/hotel/fr/new.html", server.uri());
        let mut first = provider.open().await.unwrap();
        first.goto(&url).await.unwrap();
        let mut second = provider.open().await.unwrap();
        second.goto(&url).await.unwrap();
        assert_eq!(second.current_url(), Some(target.as_str()));
        assert_eq!(provider.stats.get_info_count(InfoType::CacheHit), 1);
    }

    #[tokio::test]
    async fn test_goto_uncached_skips_fresh_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/searchresults.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Cache-Control", "max-age=600")
                    .set_body_string("<html>results</html>"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(true);
        let url = format!("{}/searchresults.html?ss=paris", server.uri());
        let mut first = provider.open().await.unwrap();
        first.goto(&url).await.unwrap();
        let mut second = provider.open().await.unwrap();
        second.goto_uncached(&url).await.unwrap();
        assert_eq!(provider.stats.get_info_count(InfoType::CacheHit), 0);
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = HttpSessionProvider::new(
            ClientSettings {
                user_agent: "a".into(),
                timeout: Duration::from_secs(1),
                accept_language: None,
            },
            vec!["http://[::1".into()],
            Arc::new(ResponseCache::new(false)),
            Arc::new(ProcessingStats::new()),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(InitializationError::ProxyUrlError(_))));
    }
}
