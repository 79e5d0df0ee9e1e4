//! Scripted collector.
//!
//! Visits each configured source in turn, extracts entries with the site's
//! variant, normalizes dates, then keeps only recent entries, dedups by
//! `(title, url)` and sorts newest first. A failing source is logged and
//! skipped; the rest of the run continues.

use crate::config::Config;
use crate::error::BoxError;
use crate::extractors::Extractor;
use crate::fetch::PageFetcher;
use crate::models::{ArticleRecord, SCRIPTED_COLUMNS, ScriptedRow};
use crate::outputs::dataset;
use crate::pipeline::{dedup_by, filter_recent, normalize, sort_by_recency, title_and_url};
use crate::utils::pause_between_sources;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{error, info, instrument, warn};

/// Fetch and extract every configured source, returning normalized records
/// in discovery order.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len()))]
pub async fn collect<F: PageFetcher>(config: &Config, fetcher: &F, now: DateTime<Utc>) -> Vec<ArticleRecord> {
    let mut records = Vec::new();

    for (i, source) in config.sources.iter().enumerate() {
        if i > 0 {
            pause_between_sources(&config.http).await;
        }

        let kind = source.resolved_kind();
        info!(source = %source.url, ?kind, "Fetching articles");

        let page = if kind.needs_browser() {
            match fetcher.render(&source.url).await {
                Some(page) => page,
                None => {
                    warn!(source = %source.url, "Rendering failed; skipping source");
                    continue;
                }
            }
        } else {
            match fetcher.fetch(&source.url).await {
                Ok(page) => page,
                Err(e) => {
                    error!(source = %source.url, error = %e, "Fetch failed; skipping source");
                    continue;
                }
            }
        };

        let found = kind.extract(&page, &source.url);
        info!(source = %source.url, count = found.len(), "Found articles");
        records.extend(
            found
                .into_iter()
                .map(|raw| normalize(raw, kind.date_formats(), now)),
        );
        info!(total = records.len(), "Total articles found so far");
    }

    records
}

/// Recency filter, then dedup & sort.
pub fn finalize(records: Vec<ArticleRecord>, now: DateTime<Utc>, window: Duration) -> Vec<ArticleRecord> {
    let before = records.len();
    let recent = filter_recent(records, now, window);
    info!(
        dropped = before - recent.len(),
        kept = recent.len(),
        "Filtered old articles"
    );
    let mut unique = dedup_by(recent, title_and_url);
    sort_by_recency(&mut unique);
    unique
}

/// Overwrite the scripted dataset at `path`.
pub fn save(path: &Path, records: &[ArticleRecord]) -> Result<(), BoxError> {
    let rows: Vec<ScriptedRow> = records.iter().map(ScriptedRow::from).collect();
    dataset::write_rows(path, &rows, SCRIPTED_COLUMNS)?;
    info!(count = rows.len(), path = %path.display(), "Saved unique articles");
    Ok(())
}

/// The `collect` stage end to end: fetch every source, keep the recent
/// unique entries and rewrite the scripted dataset.
///
/// # Arguments
///
/// * `config` - Sources, lookback window, pacing and the dataset path
/// * `fetcher` - Page source; [`crate::fetch::WebFetcher`] outside of tests
///
/// # Returns
///
/// The number of records written. The dataset is replaced on every run, so a
/// run that finds nothing leaves a header-only file rather than last run's
/// rows.
///
/// # Errors
///
/// Only a failure to write the dataset. Per-source fetch and render failures
/// are logged and skipped.
///
/// # Examples
///
/// ```ignore
/// let fetcher = WebFetcher::new(&config)?;
/// let saved = collector::run(&config, &fetcher).await?;
/// ```
#[instrument(level = "info", skip_all)]
pub async fn run<F: PageFetcher>(config: &Config, fetcher: &F) -> Result<usize, BoxError> {
    let now = Utc::now();
    let collected = collect(config, fetcher, now).await;
    let records = finalize(collected, now, config.lookback());

    if records.is_empty() {
        warn!("No articles were collected. Check the logs for more information.");
    }
    save(&config.paths.scripted_dataset, &records)?;
    Ok(records.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{HttpConfig, SourceConfig};
    use crate::extractors::SourceKind;
    use std::collections::HashMap;

    /// In-memory pages keyed by URL; unknown URLs fail like a 404.
    #[derive(Default)]
    pub(crate) struct StubFetcher {
        pub pages: HashMap<String, String>,
    }

    impl StubFetcher {
        pub fn with(mut self, url: &str, page: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), page.into());
            self
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, BoxError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| format!("404 for {url}").into())
        }

        async fn render(&self, url: &str) -> Option<String> {
            self.pages.get(url).cloned()
        }
    }

    pub(crate) fn quiet_config(sources: Vec<SourceConfig>) -> Config {
        Config {
            sources,
            http: HttpConfig {
                min_delay_secs: 0.0,
                max_delay_secs: 0.0,
                ..HttpConfig::default()
            },
            ..Config::default()
        }
    }

    const KDN: &str = "https://www.kdnuggets.com/tag/data-engineering";
    const BDW: &str = "https://www.bigdatawire.com/more-articles";
    const PE: &str = "https://newsletter.pragmaticengineer.com/s/deepdives";

    fn now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2024, 10, 20, 12, 0, 0).unwrap()
    }

    fn kdn_item(title: &str, href: &str, date: DateTime<Utc>) -> String {
        format!(
            r##"<li><a href="{href}"><b>{title}</b></a><font color="#808080">- {}</font></li>"##,
            date.format("%b %d, %Y.")
        )
    }

    #[tokio::test]
    async fn test_three_week_window_keeps_only_recent() {
        let page = format!(
            "<ul>{}{}</ul>",
            kdn_item("Ten days", "/ten", now() - Duration::days(10)),
            kdn_item("Forty days", "/forty", now() - Duration::days(40)),
        );
        let fetcher = StubFetcher::default().with(KDN, page);
        let config = quiet_config(vec![SourceConfig::new(KDN)]);

        let records = finalize(collect(&config, &fetcher, now()).await, now(), config.lookback());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Ten days");
        assert_eq!(records[0].url, "https://www.kdnuggets.com/ten");
    }

    #[tokio::test]
    async fn test_run_saves_only_recent_records() {
        let today = Utc::now();
        let page = format!(
            "<ul>{}{}</ul>",
            kdn_item("Ten days", "/ten", today - Duration::days(10)),
            kdn_item("Forty days", "/forty", today - Duration::days(40)),
        );
        let fetcher = StubFetcher::default().with(KDN, page);
        let tmp = tempfile::tempdir().unwrap();
        let mut config = quiet_config(vec![SourceConfig::new(KDN)]);
        config.paths.scripted_dataset = tmp.path().join("data_news_articles.csv");

        assert_eq!(run(&config, &fetcher).await.unwrap(), 1);
        let saved: Vec<ScriptedRow> = dataset::read_rows(&config.paths.scripted_dataset).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title, "Ten days");
        assert_eq!(saved[0].link, "https://www.kdnuggets.com/ten");
    }

    #[tokio::test]
    async fn test_empty_run_replaces_previous_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = quiet_config(vec![SourceConfig::new(KDN), SourceConfig::new(BDW)]);
        config.paths.scripted_dataset = tmp.path().join("data_news_articles.csv");
        std::fs::write(
            &config.paths.scripted_dataset,
            "title,link,date,summary,source,published_at,collected_at\n\
             STALE,https://old/a,2020-01-01,S,https://old,2020-01-01T00:00:00Z,2020-01-02T00:00:00Z\n",
        )
        .unwrap();

        // every source fails
        let saved = run(&config, &StubFetcher::default()).await.unwrap();
        assert_eq!(saved, 0);

        let text = std::fs::read_to_string(&config.paths.scripted_dataset).unwrap();
        assert_eq!(text, "title,link,date,summary,source,published_at,collected_at\n");
        let rows: Vec<ScriptedRow> = dataset::read_rows(&config.paths.scripted_dataset).unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_run() {
        let bdw_page = r#"<div class="post"><h3 class="post-title"><a href="https://www.bigdatawire.com/2024/10/18/news/">News</a></h3></div>"#;
        let fetcher = StubFetcher::default().with(BDW, bdw_page);
        // KDN and PE are not served: a fetch error and a failed render
        let config = quiet_config(vec![
            SourceConfig::new(KDN),
            SourceConfig::new(PE),
            SourceConfig::new(BDW),
        ]);

        let records = collect(&config, &fetcher, now()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "News");
        assert_eq!(records[0].summary, crate::models::NO_SUMMARY);
    }

    #[tokio::test]
    async fn test_dynamic_source_goes_through_render() {
        let page = r#"{"title":"Deep dive","post_date":"2024-10-15T09:00:00.000Z","canonical_url":"https://newsletter.pragmaticengineer.com/p/deep-dive"}"#;
        let fetcher = StubFetcher::default().with(PE, page);
        let config = quiet_config(vec![SourceConfig {
            url: PE.to_string(),
            kind: Some(SourceKind::DynamicApp),
        }]);

        let records = collect(&config, &fetcher, now()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(
            crate::dates::to_canonical(&records[0].publish_date),
            "2024-10-15T09:00:00Z"
        );
    }

    #[tokio::test]
    async fn test_duplicates_collapse_and_sort_newest_first() {
        let page = format!(
            "<ul>{}{}{}</ul>",
            kdn_item("Older", "/older", now() - Duration::days(5)),
            kdn_item("Newer", "/newer", now() - Duration::days(1)),
            kdn_item("Older", "/older", now() - Duration::days(5)),
        );
        let fetcher = StubFetcher::default().with(KDN, page);
        let config = quiet_config(vec![SourceConfig::new(KDN)]);

        let records = finalize(collect(&config, &fetcher, now()).await, now(), config.lookback());
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[test]
    fn test_save_writes_scripted_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data/data_news_articles.csv");
        let record = ArticleRecord {
            url: "https://x/a".to_string(),
            title: "A".to_string(),
            source: KDN.to_string(),
            publish_date: now(),
            summary: "S".to_string(),
            collected_at: now(),
        };

        save(&path, &[record]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("title,link,date,summary,source,published_at,collected_at")
        );
        assert_eq!(
            lines.next(),
            Some("A,https://x/a,2024-10-20,S,https://www.kdnuggets.com/tag/data-engineering,2024-10-20T12:00:00Z,2024-10-20T12:00:00Z")
        );
    }
}
