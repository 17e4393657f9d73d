//! Logger initialization.
//!
//! This module provides functions to initialize the logger with custom formatting.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::LevelFilter;

/// Initializes the logger with the specified level and format.
///
/// `RUST_LOG` is read first and `level` overrides it. Plain output is
/// coloured and prefixed with a wall-clock time; JSON output has one object
/// per line with `ts`, `level`, `target` and `msg`.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if logger initialization fails.
///
/// # Examples
///
/// ```bash
/// # Use RUST_LOG for quick debugging
/// RUST_LOG=debug booking_crawler --search Paris
///
/// # CLI level takes precedence
/// RUST_LOG=debug booking_crawler --search Paris --log-level info
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    // Read from RUST_LOG environment variable first, then override with CLI arg
    let mut builder = env_logger::Builder::from_default_env();

    // Override with CLI-provided level (takes precedence over RUST_LOG)
    builder.filter_level(level);
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("sqlx", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("cookie_store", LevelFilter::Warn);
    builder.filter_module("booking_crawler", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let tag = format!("{:<5}", level);
                let tag = match level {
                    log::Level::Error => tag.red().bold(),
                    log::Level::Warn => tag.yellow(),
                    log::Level::Info => tag.green(),
                    log::Level::Debug => tag.blue(),
                    log::Level::Trace => tag.purple(),
                };
                // "booking_crawler::crawl::worker" reads as "crawl::worker"
                let target = record.target();
                let target = target.strip_prefix("booking_crawler::").unwrap_or(target);

                writeln!(
                    buf,
                    "{} {} {} {}",
                    chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
                    tag,
                    target.cyan(),
                    record.args()
                )
            });
        }
    }

    // try_init: a second initialization is an error, not a panic
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}
