//! Command-line interface definitions for the data news collector.
//!
//! Every stage of the pipeline is its own subcommand; `run` chains them.
//! Options can also come from environment variables.

use clap::{Parser, Subcommand};

/// Command-line arguments for the data news collector.
///
/// # Examples
///
/// ```sh
/// # Scripted collector only
/// data_news_collector collect
///
/// # Whole pipeline with a custom configuration
/// data_news_collector --config config.yaml run
///
/// # Dashboard on another address
/// data_news_collector view --bind 0.0.0.0:8080
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// API key for the OpenAI-compatible model endpoint
    #[arg(long, env = "OPENAI_API_KEY", global = true, hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Scrape the configured sources with the site extractors
    Collect,
    /// Extract articles from the AI sources with the remote model
    AiCollect,
    /// Combine both datasets into the merged dataset
    Merge,
    /// Serve the dashboard over the merged dataset
    View {
        /// Address to listen on (defaults to the configured one)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run both collectors, merge, then serve the dashboard until Ctrl+C
    Run,
}
