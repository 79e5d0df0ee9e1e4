//! Helpers for logging, file naming, output directories and request pacing.

use crate::config::HttpConfig;
use crate::error::BoxError;
use rand::{Rng, rng};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary at or below `max`
/// bytes and suffixed with `"…(+N bytes)"`.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// File name for a raw page dump: the URL without its scheme, with path and
/// query separators replaced by `_`.
///
/// `https://www.kdnuggets.com/tag/data-engineering` becomes
/// `www.kdnuggets.com_tag_data-engineering.txt`.
pub fn raw_content_filename(source: &str) -> String {
    let without_scheme = source.split_once("//").map(|(_, rest)| rest).unwrap_or(source);
    let sanitized: String = without_scheme
        .chars()
        .map(|c| match c {
            '/' | '?' | '&' | '=' | ':' | '#' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("{sanitized}.txt")
}

/// Ensure a directory exists and is writable by creating and removing a
/// probe file in it.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), BoxError> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}

/// Random pause between consecutive source fetches.
pub fn politeness_delay(http: &HttpConfig) -> Duration {
    let (lo, hi) = (http.min_delay_secs.max(0.0), http.max_delay_secs.max(0.0));
    if hi <= lo {
        return Duration::from_secs_f64(lo);
    }
    Duration::from_secs_f64(rng().random_range(lo..=hi))
}

/// Sleep for [`politeness_delay`].
pub async fn pause_between_sources(http: &HttpConfig) {
    let delay = politeness_delay(http);
    debug!(?delay, "Pausing before next source");
    tokio::time::sleep(delay).await;
}
