//! # Data News Collector
//!
//! Collects recent articles from engineering blogs and data-engineering news
//! sites, merges them into one CSV dataset and serves a small dashboard over
//! the recent slice.
//!
//! ## Usage
//!
//! ```sh
//! data_news_collector run
//! ```
//!
//! ## Architecture
//!
//! The application is a pipeline of independently runnable stages:
//! 1. **collect**: site extractors over the configured listings, date
//!    normalization, recency filter, dedup and sort
//! 2. **ai-collect**: a remote model lists the articles on each AI source page
//! 3. **merge**: both datasets combined, deduplicated by URL
//! 4. **view**: dashboard over the current and previous month
//!
//! `run` chains all four; the collectors run as child processes.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod ai_collector;
mod api;
mod cli;
mod collector;
mod config;
mod dates;
mod error;
mod extractors;
mod fetch;
mod merge;
mod models;
mod orchestrate;
mod outputs;
mod pipeline;
mod utils;
mod viewer;

use cli::{Cli, Command};
use config::Config;
use error::BoxError;
use fetch::WebFetcher;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    debug!(command = ?args.command, config = ?args.config, "Parsed CLI arguments");
    info!(command = ?args.command, "data_news_collector starting up");

    let outcome = dispatch(&args).await;

    let elapsed = start_time.elapsed();
    match outcome {
        Ok(()) => {
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                millis = elapsed.subsec_millis(),
                "Execution complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, ?elapsed, "Execution failed");
            Err(e as Box<dyn Error>)
        }
    }
}

async fn dispatch(args: &Cli) -> Result<(), BoxError> {
    let config = Config::load(args.config.as_deref(), args.openai_api_key.clone())?;

    match &args.command {
        Command::Collect => {
            check_output_dir(&config.paths.scripted_dataset).await?;
            let fetcher = WebFetcher::new(&config)?;
            let count = collector::run(&config, &fetcher).await?;
            info!(count, "Scripted collection finished");
        }
        Command::AiCollect => {
            check_output_dir(&config.paths.ai_dataset).await?;
            let fetcher = WebFetcher::new(&config)?;
            let count = ai_collector::run(&config, &fetcher).await?;
            info!(count, "AI-assisted collection finished");
        }
        Command::Merge => {
            merge::run(&config)?;
        }
        Command::View { bind } => {
            let bind = bind.as_deref().unwrap_or(&config.viewer.bind);
            viewer::serve(&config, bind).await?;
        }
        Command::Run => {
            orchestrate::run(&config, args.config.as_deref()).await?;
        }
    }
    Ok(())
}

/// Fail early when a dataset's directory cannot be written.
async fn check_output_dir(dataset: &Path) -> Result<(), BoxError> {
    let dir = match dataset.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    if let Err(e) = ensure_writable_dir(dir).await {
        error!(
            path = %dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    Ok(())
}
