//! Browser sessions bound to proxy identities.
//!
//! A session is owned by one worker at a time. The crawl core only needs
//! navigation, the resolved URL and a DOM snapshot, so any driver (plain HTTP
//! or a real browser) can sit behind these traits.

mod acquire;
mod denylist;
mod http;

use async_trait::async_trait;

use crate::error_handling::{FetchError, SessionError};

pub use acquire::SessionAcquirer;
pub use http::HttpSessionProvider;

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Loggable identity of the egress proxy ("direct" without one).
    fn proxy_identity(&self) -> &str;

    /// Navigates to `url`, following redirects. May be answered from the
    /// response cache.
    async fn goto(&mut self, url: &str) -> Result<(), FetchError>;

    /// Navigates to `url` over the network, never reading the response cache.
    async fn goto_uncached(&mut self, url: &str) -> Result<(), FetchError>;

    /// URL of the loaded page after redirects.
    fn current_url(&self) -> Option<&str>;

    /// Current DOM snapshot of the loaded page.
    async fn content(&self) -> Result<String, FetchError>;

    async fn close(&mut self);
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Opens a fresh session on a new proxy identity.
    async fn open(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}
