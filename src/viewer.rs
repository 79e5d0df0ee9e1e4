//! Dashboard over the merged dataset.
//!
//! Shows articles published from the first day of the previous calendar
//! month onwards, newest first. Records with an unknown date are listed last
//! with a placeholder instead of being hidden. The dataset is re-read on
//! every request, so a fresh merge shows up without a restart.

use crate::config::Config;
use crate::error::{BoxError, PipelineError};
use crate::models::ArticleRecord;
use crate::outputs::dataset;
use crate::pipeline::sort_by_recency;
use askama::Template;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

const DATE_NOT_AVAILABLE: &str = "Date not available";
const NO_DATASET: &str = "No articles found. Please run the news collector first.";
const EMPTY_WINDOW: &str = "No articles found for the current month or the month before.";

#[derive(Clone)]
pub struct AppState {
    pub dataset: PathBuf,
}

struct ArticleView {
    title: String,
    source: String,
    published: String,
    url: String,
}

impl From<&ArticleRecord> for ArticleView {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            title: record.title.clone(),
            source: record.source.clone(),
            published: if record.has_date() {
                record.publish_date.format("%Y-%m-%d").to_string()
            } else {
                DATE_NOT_AVAILABLE.to_string()
            },
            url: record.url.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    window_label: String,
    warning: Option<String>,
    articles: Vec<ArticleView>,
}

/// `[first day of previous month, first day of next month)` around `now`,
/// comparing full dates so a January view reaches back into December of the
/// previous year.
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    let start = first.checked_sub_months(Months::new(1)).unwrap_or(first);
    let end = first.checked_add_months(Months::new(1)).unwrap_or(first);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    )
}

/// Records to display at `now`: dated ones inside [`month_window`] plus all
/// undated ones, newest first with undated last.
pub fn recent_slice(records: Vec<ArticleRecord>, now: DateTime<Utc>) -> Vec<ArticleRecord> {
    let (start, end) = month_window(now);
    let mut slice: Vec<ArticleRecord> = records
        .into_iter()
        .filter(|r| !r.has_date() || (r.publish_date >= start && r.publish_date < end))
        .collect();
    sort_by_recency(&mut slice);
    slice
}

fn load_slice(path: &Path, now: DateTime<Utc>) -> Result<Vec<ArticleRecord>, BoxError> {
    let records: Vec<ArticleRecord> = dataset::read_rows(path)?;
    Ok(recent_slice(records, now))
}

/// [`load_slice`] on the blocking pool, keeping file and CSV work off the
/// request workers.
async fn load_slice_blocking(path: PathBuf, now: DateTime<Utc>) -> Result<Vec<ArticleRecord>, BoxError> {
    tokio::task::spawn_blocking(move || load_slice(&path, now)).await?
}

fn is_missing(err: &BoxError) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingInput { .. })
    )
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/articles", get(articles_handler))
        .with_state(Arc::new(state))
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let now = Utc::now();
    let (start, _) = month_window(now);
    let window_label = format!("articles since {}", start.format("%Y-%m-%d"));

    let (warning, articles) = match load_slice_blocking(state.dataset.clone(), now).await {
        Ok(slice) if slice.is_empty() => (Some(EMPTY_WINDOW.to_string()), Vec::new()),
        Ok(slice) => (None, slice.iter().map(ArticleView::from).collect()),
        Err(e) if is_missing(&e) => {
            warn!(path = %state.dataset.display(), "Merged dataset not found");
            (Some(NO_DATASET.to_string()), Vec::new())
        }
        Err(e) => return server_error(e),
    };

    render_html(DashboardTemplate {
        window_label,
        warning,
        articles,
    })
}

async fn articles_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_slice_blocking(state.dataset.clone(), Utc::now()).await {
        Ok(slice) => Json(slice).into_response(),
        Err(e) if is_missing(&e) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": NO_DATASET })),
        )
            .into_response(),
        Err(e) => server_error(e),
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(err.into()),
    }
}

fn server_error(err: BoxError) -> Response {
    error!(error = %err, "Dashboard request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}

/// Serve the dashboard until Ctrl+C.
///
/// # Arguments
///
/// * `config` - Supplies the merged dataset path, which is re-read on every
///   request
/// * `bind` - Listen address such as `127.0.0.1:8501`
///
/// # Returns
///
/// `Ok(())` after a graceful shutdown.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails. A
/// missing dataset is not an error; the page shows a warning instead.
///
/// # Examples
///
/// ```ignore
/// viewer::serve(&config, &config.viewer.bind).await?;
/// ```
#[instrument(level = "info", skip(config))]
pub async fn serve(config: &Config, bind: &str) -> Result<(), BoxError> {
    let state = AppState {
        dataset: config.paths.merged_dataset.clone(),
    };
    let listener = TcpListener::bind(bind).await?;
    info!(
        addr = %listener.local_addr()?,
        dataset = %config.paths.merged_dataset.display(),
        "Dashboard listening"
    );
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down dashboard");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::SENTINEL;
    use crate::models::{MERGED_COLUMNS, NO_SUMMARY};
    use axum::body::Body;
    use chrono::{Duration, TimeZone};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn rec(url: &str, date: DateTime<Utc>) -> ArticleRecord {
        ArticleRecord {
            url: url.to_string(),
            title: format!("Title {url}"),
            source: "https://blog.example.com/".to_string(),
            publish_date: date,
            summary: NO_SUMMARY.to_string(),
            collected_at: utc(2024, 10, 20),
        }
    }

    #[test]
    fn test_month_window() {
        let (start, end) = month_window(utc(2024, 10, 20));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_window_wraps_year() {
        let (start, end) = month_window(utc(2025, 1, 5));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_recent_slice_months_m_and_m_minus_one() {
        let now = utc(2024, 10, 20);
        let records = vec![
            rec("m-1", utc(2024, 9, 3)),
            rec("m-2", utc(2024, 8, 30)),
            rec("m", utc(2024, 10, 2)),
        ];
        let urls: Vec<String> = recent_slice(records, now).into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["m", "m-1"]);
    }

    #[test]
    fn test_recent_slice_same_month_previous_year_is_excluded() {
        let now = utc(2025, 1, 5);
        let records = vec![
            rec("dec-last-year", utc(2024, 12, 20)),
            rec("dec-two-years-ago", utc(2023, 12, 20)),
            rec("jan-last-year", utc(2024, 1, 3)),
        ];
        let urls: Vec<String> = recent_slice(records, now).into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["dec-last-year"]);
    }

    #[test]
    fn test_undated_records_are_kept_last() {
        let now = utc(2024, 10, 20);
        let records = vec![rec("undated", SENTINEL), rec("dated", now - Duration::days(1))];
        let slice = recent_slice(records, now);
        assert_eq!(slice[1].url, "undated");
        assert_eq!(ArticleView::from(&slice[1]).published, DATE_NOT_AVAILABLE);
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_lists_recent_articles() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("combined.csv");
        let now = Utc::now();
        let (start, _) = month_window(now);
        dataset::write_rows(
            &path,
            &[
                rec("recent", now - Duration::hours(1)),
                rec("ancient", start - Duration::days(40)),
            ],
            MERGED_COLUMNS,
        )
        .unwrap();

        let (status, body) = get_body(app(AppState { dataset: path }), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Data News Collector"));
        assert!(body.contains("Title recent"));
        assert!(!body.contains("Title ancient"));
        assert!(body.contains("Read more"));
    }

    #[tokio::test]
    async fn test_missing_dataset_shows_warning() {
        let state = AppState {
            dataset: PathBuf::from("/definitely/not/here.csv"),
        };
        let (status, body) = get_body(app(state.clone()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Please run the news collector first"));

        let (status, _) = get_body(app(state), "/api/articles").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blocking_load_keeps_missing_input_error() {
        let err = load_slice_blocking(PathBuf::from("/definitely/not/here.csv"), Utc::now())
            .await
            .unwrap_err();
        assert!(is_missing(&err));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("combined.csv");
        let now = Utc::now();
        dataset::write_rows(&path, &[rec("recent", now - Duration::hours(1))], MERGED_COLUMNS).unwrap();
        let slice = load_slice_blocking(path, now).await.unwrap();
        assert_eq!(slice.len(), 1);
    }

    #[tokio::test]
    async fn test_api_returns_slice_as_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("combined.csv");
        let now = Utc::now();
        dataset::write_rows(&path, &[rec("recent", now - Duration::hours(1))], MERGED_COLUMNS).unwrap();

        let (status, body) = get_body(app(AppState { dataset: path }), "/api/articles").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["url"], "recent");
    }
}
