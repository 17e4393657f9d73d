//! Error type definitions.
//!
//! This module defines all error, warning, and info types used throughout the application.

use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Configuration problems. The only error category that aborts a whole run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing \"search\" or \"startUrls\" in the crawl input")]
    MissingSeed,

    #[error("\"search\" and \"startUrls\" are mutually exclusive")]
    ConflictingSeed,

    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(String),

    #[error("Unparseable date '{0}' (expected MM-DD-YYYY, MM/DD/YYYY or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Both checkIn and checkOut are required when either is given")]
    IncompleteStayDates,

    #[error("checkOut ({check_out}) must be after checkIn ({check_in})")]
    InvalidStayRange { check_in: String, check_out: String },

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("minScore must be between 0 and 10, got {0}")]
    InvalidMinScore(f64),

    #[error("Failed to read input file {path}: {reason}")]
    InputFile { path: String, reason: String },

    #[error("Invalid crawl input: {0}")]
    InvalidInput(String),
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// A configured proxy URL could not be used.
    #[error("Invalid proxy URL '{0}'")]
    ProxyUrlError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

/// A navigation that did not produce a usable page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The target matches the static denylist and is never fetched.
    #[error("Skipped denylisted resource: {0}")]
    Blocked(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Response body too large ({size} bytes) for {url}")]
    BodyTooLarge { url: String, size: usize },

    #[error("Transport error: {0}")]
    Transport(#[from] ReqwestError),

    /// Failure reported by a non-HTTP session driver.
    #[error("Session driver error: {0}")]
    Driver(String),

    #[error("No page has been loaded in this session")]
    NoPage,
}

/// Failures of the proxy-validated session acquirer.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Could not open a session after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Session provider error: {0}")]
    Provider(String),
}

/// Failures of a request queue backend.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Queue serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown request label '{0}'")]
    UnknownLabel(String),
}

impl From<sqlx::Error> for QueueError {
    fn from(e: sqlx::Error) -> Self {
        QueueError::Database(DatabaseError::SqlError(e))
    }
}

/// Failures of the output sink or the crawl-state file.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Opening, writing or renaming a file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded as JSON.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Types of errors that can occur while processing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    NavigationError,
    NavigationTimeout,
    HttpStatusError,
    BlockedRequest,
    SessionAcquireError,
    RequestTimeout,
    HandlerError,
    RetriesExhausted,
    SinkError,
}

/// Types of warnings that can occur while extracting.
///
/// Warnings indicate missing data that doesn't prevent a request from being
/// handled but is worth tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    PriceNotRendered,
    MissingStructuredData,
    MissingResultCount,
    UnavailableRoom,
}

/// Notable events that aren't errors or warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    SessionValidated,
    SessionProbeRejected,
    SessionReused,
    SessionRetired,
    RequestRequeued,
    CacheHit,
    ListingRecordEmitted,
    DetailRecordEmitted,
    DuplicateSuppressed,
    BelowMinScore,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::NavigationError => "Navigation error",
            ErrorType::NavigationTimeout => "Navigation timeout",
            ErrorType::HttpStatusError => "HTTP status error",
            ErrorType::BlockedRequest => "Denylisted request",
            ErrorType::SessionAcquireError => "Session acquisition error",
            ErrorType::RequestTimeout => "Request cycle timeout",
            ErrorType::HandlerError => "Page handler error",
            ErrorType::RetriesExhausted => "Retries exhausted",
            ErrorType::SinkError => "Output sink error",
        }
    }
}

impl WarningType {
    /// Returns a human-readable string representation of the warning type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::PriceNotRendered => "Price not rendered",
            WarningType::MissingStructuredData => "Missing structured data",
            WarningType::MissingResultCount => "Missing result count",
            WarningType::UnavailableRoom => "Room without price",
        }
    }
}

impl InfoType {
    /// Returns a human-readable string representation of the info type.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::SessionValidated => "Session validated",
            InfoType::SessionProbeRejected => "Session probe rejected",
            InfoType::SessionReused => "Session reused",
            InfoType::SessionRetired => "Session retired",
            InfoType::RequestRequeued => "Request re-enqueued",
            InfoType::CacheHit => "Response cache hit",
            InfoType::ListingRecordEmitted => "Listing record emitted",
            InfoType::DetailRecordEmitted => "Detail record emitted",
            InfoType::DuplicateSuppressed => "Duplicate listing suppressed",
            InfoType::BelowMinScore => "Below minimum score",
        }
    }
}
