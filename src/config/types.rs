//! Configuration types.
//!
//! `Config` is the library-level configuration: the crawl input plus the
//! runtime knobs (paths, timeouts, retry bounds) that the CLI or an embedder
//! supplies.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::*;
use crate::config::input::{CrawlInput, StartUrl};
use crate::error_handling::ConfigError;
use crate::url_builder::parse_stay_date;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Bounded polling schedule for content that renders asynchronously.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: POLL_MAX_ATTEMPTS,
        }
    }
}

/// Which of the two listing output modes is active for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Extract listing records in-page.
    Listing,
    /// Enqueue detail pages and extract full hotel records there.
    Detail,
}

/// Where the crawl starts from.
#[derive(Debug, Clone, Copy)]
pub enum Seed<'a> {
    Search(&'a str),
    StartUrls(&'a [StartUrl]),
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use booking_crawler::{Config, CrawlInput};
///
/// let config = Config {
///     input: CrawlInput {
///         search: Some("Paris".to_string()),
///         simple: true,
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub input: CrawlInput,

    /// Origin used for generated search and probe URLs
    pub base_url: String,

    /// JSONL file receiving output records
    pub output_path: PathBuf,

    /// JSON file holding the crawl-state dedup memory
    pub state_path: PathBuf,

    /// SQLite file backing a durable request queue (in-memory queue when `None`)
    pub queue_db_path: Option<PathBuf>,

    pub log_level: LogLevel,
    pub log_format: LogFormat,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Per-navigation timeout in seconds
    pub navigation_timeout_secs: u64,

    /// Whole fetch-route-handle cycle timeout in seconds
    pub request_timeout_secs: u64,

    pub max_session_attempts: u32,
    pub max_request_retries: u32,
    pub max_session_retries: u32,

    pub poll: PollPolicy,

    /// Result cards per listing page
    pub page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: CrawlInput::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            queue_db_path: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout_secs: NAVIGATION_TIMEOUT_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            max_session_attempts: MAX_SESSION_ATTEMPTS,
            max_request_retries: MAX_REQUEST_RETRIES,
            max_session_retries: MAX_SESSION_RETRIES,
            poll: PollPolicy::default(),
            page_size: PAGE_SIZE,
        }
    }
}

impl Config {
    /// Checks everything that must hold before the first fetch.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first problem found. These are
    /// the only errors that abort a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let input = &self.input;
        let has_search = input
            .search
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        let has_start_urls = input.start_urls.as_ref().is_some_and(|u| !u.is_empty());
        match (has_search, has_start_urls) {
            (false, false) => return Err(ConfigError::MissingSeed),
            (true, true) => return Err(ConfigError::ConflictingSeed),
            _ => {}
        }

        if let Some(urls) = &input.start_urls {
            for start in urls {
                if url::Url::parse(start.url()).is_err() {
                    return Err(ConfigError::InvalidStartUrl(start.url().to_string()));
                }
            }
        }

        match (&input.check_in, &input.check_out) {
            (Some(check_in), Some(check_out)) => {
                let ci = parse_stay_date(check_in)
                    .ok_or_else(|| ConfigError::InvalidDate(check_in.clone()))?;
                let co = parse_stay_date(check_out)
                    .ok_or_else(|| ConfigError::InvalidDate(check_out.clone()))?;
                if co <= ci {
                    return Err(ConfigError::InvalidStayRange {
                        check_in: check_in.clone(),
                        check_out: check_out.clone(),
                    });
                }
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteStayDates),
        }

        if input.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if let Some(score) = input.min_score {
            if !(0.0..=10.0).contains(&score) {
                return Err(ConfigError::InvalidMinScore(score));
            }
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidStartUrl(self.base_url.clone()));
        }
        Ok(())
    }

    /// The active seed. Only meaningful after `validate()` succeeded.
    pub fn seed(&self) -> Seed<'_> {
        match (&self.input.start_urls, &self.input.search) {
            (Some(urls), _) if !urls.is_empty() => Seed::StartUrls(urls),
            (_, Some(search)) => Seed::Search(search),
            _ => Seed::StartUrls(&[]),
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.input.simple {
            OutputMode::Listing
        } else {
            OutputMode::Detail
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
