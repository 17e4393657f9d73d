//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, retry bounds)
//! - The crawl input document (`CrawlInput`)
//! - Library configuration (`Config`) and its validation
//! - CLI option parsing (`Opt`)

mod cli;
mod constants;
mod input;
mod types;

// Re-export all constants
pub use cli::Opt;
pub use constants::*;
pub use input::{CrawlInput, ProxyConfig, StartUrl, StartUserData};
pub use types::{Config, LogFormat, LogLevel, OutputMode, PollPolicy, Seed};
