//! Runtime configuration.
//!
//! Every stage receives a [`Config`] instead of reading global constants. The
//! structure deserializes from an optional YAML file; any field left out falls
//! back to the built-in value, so running without `--config` reproduces the
//! stock source lists and paths.
//!
//! ```yaml
//! lookback_weeks: 3
//! sources:
//!   - url: https://www.kdnuggets.com/tag/data-engineering
//!   - url: https://example.org/blog
//!     kind: post_listing
//! ai_sources:
//!   - https://blog.cloudflare.com/
//! paths:
//!   merged_dataset: out/combined.csv
//! ```

use crate::error::{BoxError, PipelineError};
use crate::extractors::SourceKind;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use tracing::{info, instrument, warn};

/// A scripted-collector source. `kind` is resolved from the host when omitted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub kind: Option<SourceKind>,
}

impl SourceConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: None,
        }
    }

    /// The extractor variant for this source, explicit or host-derived.
    pub fn resolved_kind(&self) -> SourceKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        match SourceKind::for_url(&self.url) {
            Some(kind) => kind,
            None => {
                warn!(
                    source = %self.url,
                    fallback = ?SourceKind::FALLBACK,
                    "No extractor registered for host; using fallback extractor"
                );
                SourceKind::FALLBACK
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub scripted_dataset: PathBuf,
    pub ai_dataset: PathBuf,
    pub merged_dataset: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw_content"),
            scripted_dataset: PathBuf::from("data/data_news_articles.csv"),
            ai_dataset: PathBuf::from("data/all_articles.csv"),
            merged_dataset: PathBuf::from("data/combined_news_articles.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Politeness pause between sources, drawn uniformly from this range.
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            timeout_secs: 10,
            min_delay_secs: 1.0,
            max_delay_secs: 3.0,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Upper bound on waiting for the interstitial's dismiss button.
    pub wait_timeout_secs: u64,
    /// Pause after each navigation so client-side rendering can finish.
    pub settle_secs: u64,
    pub dismiss_xpath: String,
    /// Query string appended to the source URL for the second navigation.
    pub sorted_path_query: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: 10,
            settle_secs: 10,
            dismiss_xpath: "//button[contains(text(), 'No thanks')]".to_string(),
            sorted_path_query: "utm_source=substack&utm_medium=menu&sort=top".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    /// Condensed page text sent to the model is cut at this many characters.
    pub max_page_chars: usize,
    /// Populated from the CLI / environment, never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_page_chars: 60_000,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub bind: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    pub ai_sources: Vec<String>,
    pub lookback_weeks: i64,
    pub paths: PathsConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
    pub model: ModelConfig,
    pub viewer: ViewerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig::new("https://www.kdnuggets.com/tag/data-engineering"),
                SourceConfig::new("https://www.bigdatawire.com/more-articles"),
                SourceConfig::new(
                    "https://newsletter.pragmaticengineer.com/s/deepdives?utm_source=substack&utm_medium=menu",
                ),
            ],
            ai_sources: vec!["https://blog.cloudflare.com/".to_string()],
            lookback_weeks: 3,
            paths: PathsConfig::default(),
            http: HttpConfig::default(),
            browser: BrowserConfig::default(),
            model: ModelConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the defaults when no path is given.
    ///
    /// The API key is attached afterwards since it only ever comes from the
    /// command line or the environment.
    #[instrument(level = "info", skip(api_key))]
    pub fn load(path: Option<&str>, api_key: Option<String>) -> Result<Self, BoxError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                let parsed: Config = serde_yaml::from_str(&raw)?;
                info!(config_path = p, "Loaded configuration file");
                parsed
            }
            None => {
                info!("No configuration file given; using built-in defaults");
                Config::default()
            }
        };
        config.validate()?;
        config.model.api_key = api_key.filter(|k| !k.trim().is_empty());
        Ok(config)
    }

    /// Reject values that would panic or silently empty every run.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let window = Duration::try_weeks(self.lookback_weeks)
            .filter(|w| *w >= Duration::zero())
            .filter(|w| Utc::now().checked_sub_signed(*w).is_some())
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "lookback_weeks must be a non-negative number of weeks, got {}",
                    self.lookback_weeks
                ))
            })?;
        if window.is_zero() {
            warn!("lookback_weeks is 0; only articles dated now or later are kept");
        }

        for (name, secs) in [
            ("http.min_delay_secs", self.http.min_delay_secs),
            ("http.max_delay_secs", self.http.max_delay_secs),
        ] {
            if StdDuration::try_from_secs_f64(secs).is_err() {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number of seconds, got {secs}"
                )));
            }
        }
        Ok(())
    }

    /// Recency cutoff distance for the scripted collector.
    pub fn lookback(&self) -> Duration {
        Duration::try_weeks(self.lookback_weeks).unwrap_or_else(Duration::zero)
    }
}
