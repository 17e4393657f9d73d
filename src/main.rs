//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `booking_crawler` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use booking_crawler::config::Opt;
use booking_crawler::initialization::init_logger_with;
use booking_crawler::{run_crawl, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), first from the
    // current directory, then from next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();
    let config = match Config::try_from(opt) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("booking_crawler error: {}", e);
            process::exit(2);
        }
    };

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_crawl(config).await {
        Ok(report) => {
            println!(
                "✅ Handled {} request{} ({} failed) and emitted {} record{} in {:.1}s",
                report.requests_handled,
                if report.requests_handled == 1 { "" } else { "s" },
                report.requests_failed,
                report.records_emitted,
                if report.records_emitted == 1 { "" } else { "s" },
                report.elapsed_seconds
            );
            if let Some(path) = report.output_path {
                println!("Results saved in {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("booking_crawler error: {:#}", e);
            process::exit(1);
        }
    }
}
