//! Proxy-validated session acquisition.
//!
//! The one place that decides whether an egress identity is usable: a fresh
//! session is sent to the probe URL and kept only if the origin answered with
//! the expected marker in the resolved URL. Handlers never re-check this.

use std::sync::{Arc, Mutex};

use log::{debug, warn};

use super::{BrowserSession, SessionProvider};
use crate::error_handling::{InfoType, ProcessingStats, SessionError};

pub struct SessionAcquirer {
    provider: Arc<dyn SessionProvider>,
    probe_url: String,
    marker: String,
    validate: bool,
    max_attempts: u32,
    idle: Mutex<Vec<Box<dyn BrowserSession>>>,
    idle_capacity: usize,
    stats: Arc<ProcessingStats>,
}

impl SessionAcquirer {
    /// `marker` must appear in the probe's resolved URL for a session to be
    /// accepted. `max_attempts` is clamped to at least one.
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        probe_url: String,
        marker: String,
        validate: bool,
        max_attempts: u32,
        idle_capacity: usize,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            provider,
            probe_url,
            marker,
            validate,
            max_attempts: max_attempts.max(1),
            idle: Mutex::new(Vec::new()),
            idle_capacity,
            stats,
        }
    }

    pub fn probe_url(&self) -> &str {
        &self.probe_url
    }

    fn take_idle(&self) -> Option<Box<dyn BrowserSession>> {
        match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        }
    }

    /// Returns a session ready for one page cycle.
    ///
    /// Reuses an idle session when one is pooled. Otherwise opens sessions
    /// until one passes validation. That check always loads the search page
    /// over the network; a cached copy never vouches for a new identity. On
    /// the last allowed attempt the session is returned whatever the check
    /// said, so acquisition always terminates.
    ///
    /// # Errors
    ///
    /// `SessionError::Exhausted` when the provider failed to open a session on
    /// every attempt.
    pub async fn acquire(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        if let Some(session) = self.take_idle() {
            self.stats.increment_info(InfoType::SessionReused);
            return Ok(session);
        }
        if !self.validate {
            return self.provider.open().await;
        }

        let mut last_error = String::from("no session opened");
        for attempt in 1..=self.max_attempts {
            let is_last = attempt == self.max_attempts;
            let mut session = match self.provider.open().await {
                Ok(session) => session,
                Err(e) => {
                    debug!("Session open attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                    continue;
                }
            };

            match session.goto_uncached(&self.probe_url).await {
                Ok(()) => {
                    let resolved = session.current_url().unwrap_or_default();
                    if resolved.contains(self.marker.as_str()) {
                        debug!(
                            "Session via {} validated after {} attempt(s)",
                            session.proxy_identity(),
                            attempt
                        );
                        self.stats.increment_info(InfoType::SessionValidated);
                        return Ok(session);
                    }
                    debug!(
                        "Probe via {} resolved to {}, rejecting",
                        session.proxy_identity(),
                        resolved
                    );
                    last_error = format!("probe resolved to {resolved}");
                }
                Err(e) => {
                    debug!("Probe via {} failed: {}", session.proxy_identity(), e);
                    last_error = e.to_string();
                }
            }

            if is_last {
                warn!(
                    "No session passed validation in {} attempts; using the last one",
                    self.max_attempts
                );
                return Ok(session);
            }
            self.stats.increment_info(InfoType::SessionProbeRejected);
            session.close().await;
        }

        Err(SessionError::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }

    /// Hands a session that completed its page cycle back for reuse.
    /// Closes it instead when the idle pool is full.
    pub async fn release(&self, session: Box<dyn BrowserSession>) {
        let rejected = {
            let mut idle = match self.idle.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if idle.len() < self.idle_capacity {
                idle.push(session);
                None
            } else {
                Some(session)
            }
        };
        if let Some(mut session) = rejected {
            session.close().await;
        }
    }

    /// Closes a session suspected dead. It is never reused.
    pub async fn retire(&self, mut session: Box<dyn BrowserSession>) {
        debug!("Retiring session via {}", session.proxy_identity());
        self.stats.increment_info(InfoType::SessionRetired);
        session.close().await;
    }

    /// Closes every pooled session.
    pub async fn close_idle(&self) {
        let sessions: Vec<_> = match self.idle.lock() {
            Ok(mut idle) => idle.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for mut session in sessions {
            session.close().await;
        }
    }

    pub fn idle_count(&self) -> usize {
        match self.idle.lock() {
            Ok(idle) => idle.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
