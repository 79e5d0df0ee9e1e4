//! Page retrieval: plain HTTP for static listings, a headless browser session
//! for client-rendered ones. Every retrieved body is also dumped verbatim to
//! the raw-content directory.

use crate::config::{BrowserConfig, Config};
use crate::error::{BoxError, PipelineError};
use crate::utils::{raw_content_filename, truncate_for_log};
use headless_chrome::{Browser, LaunchOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Source of page bodies for the collectors.
pub trait PageFetcher {
    /// GET `url` and return its body. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String, BoxError>;

    /// Render `url` in a browser. Every failure is absorbed: `None` means the
    /// source yields no articles this run.
    async fn render(&self, url: &str) -> Option<String>;
}

/// [`PageFetcher`] backed by reqwest and headless Chrome.
#[derive(Debug, Clone)]
pub struct WebFetcher {
    client: reqwest::Client,
    browser: BrowserConfig,
    raw_dir: PathBuf,
}

impl WebFetcher {
    pub fn new(config: &Config) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder()
            .user_agent(config.http.user_agent.clone())
            .timeout(config.http.timeout())
            .build()?;
        Ok(Self {
            client,
            browser: config.browser.clone(),
            raw_dir: config.paths.raw_dir.clone(),
        })
    }
}

impl PageFetcher for WebFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, BoxError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        info!(bytes = body.len(), "Fetched page");
        save_raw_logged(&self.raw_dir, url, &body).await;
        Ok(body)
    }

    #[instrument(level = "info", skip(self))]
    async fn render(&self, url: &str) -> Option<String> {
        let target = url.to_string();
        let browser = self.browser.clone();
        let outcome = tokio::task::spawn_blocking(move || render_blocking(&target, &browser)).await;

        match outcome {
            Ok(Ok((final_url, html))) => {
                info!(bytes = html.len(), %final_url, "Rendered page");
                save_raw_logged(&self.raw_dir, &final_url, &html).await;
                Some(html)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Browser session failed; no articles for this source");
                None
            }
            Err(e) => {
                warn!(error = %e, "Browser task aborted; no articles for this source");
                None
            }
        }
    }
}

fn browser_err(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Browser(e.to_string())
}

/// The same page with its query replaced, used for the second navigation.
pub fn sorted_url(url: &str, query: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(Some(query).filter(|q| !q.is_empty()));
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Drive one headless browser session: open the page, dismiss the
/// subscription interstitial (bounded wait), let the client render, reload the
/// sorted listing and capture the resulting page source.
///
/// Returns the final URL together with the HTML. The browser process is torn
/// down when `browser` drops.
fn render_blocking(url: &str, cfg: &BrowserConfig) -> Result<(String, String), PipelineError> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .build()
        .map_err(browser_err)?;
    let browser = Browser::new(options).map_err(browser_err)?;
    let tab = browser.new_tab().map_err(browser_err)?;

    tab.navigate_to(url)
        .map_err(browser_err)?
        .wait_until_navigated()
        .map_err(browser_err)?;

    let wait = Duration::from_secs(cfg.wait_timeout_secs);
    let button = tab
        .wait_for_xpath_with_custom_timeout(&cfg.dismiss_xpath, wait)
        .map_err(|e| PipelineError::Browser(format!("dismiss button did not appear within {wait:?}: {e}")))?;
    button.click().map_err(browser_err)?;
    debug!("Dismissed interstitial");

    let settle = Duration::from_secs(cfg.settle_secs);
    std::thread::sleep(settle);

    let sorted = sorted_url(url, &cfg.sorted_path_query);
    tab.navigate_to(&sorted)
        .map_err(browser_err)?
        .wait_until_navigated()
        .map_err(browser_err)?;
    std::thread::sleep(settle);

    let html = tab.get_content().map_err(browser_err)?;
    Ok((tab.get_url(), html))
}

/// Write `content` to `raw_dir/<sanitized source>.txt`, returning the path.
pub async fn save_raw_content(raw_dir: &Path, source: &str, content: &str) -> Result<PathBuf, BoxError> {
    fs::create_dir_all(raw_dir).await?;
    let path = raw_dir.join(raw_content_filename(source));
    fs::write(&path, content).await?;
    Ok(path)
}

async fn save_raw_logged(raw_dir: &Path, source: &str, content: &str) {
    match save_raw_content(raw_dir, source, content).await {
        Ok(path) => info!(path = %path.display(), "Saved raw content"),
        Err(e) => warn!(
            error = %e,
            source = %truncate_for_log(source, 120),
            "Could not save raw content"
        ),
    }
}
