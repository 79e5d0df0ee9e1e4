//! Record-level stages shared by the collectors and the merge step:
//! normalization, the recency filter, and dedup & sort.

use crate::dates;
use crate::models::{ArticleRecord, RawRecord};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use std::hash::Hash;
use tracing::{debug, instrument};

/// Turn an extracted entry into an [`ArticleRecord`], parsing its date text
/// with the source's `formats`. Unparseable dates become the sentinel.
pub fn normalize(raw: RawRecord, formats: &[&str], collected_at: DateTime<Utc>) -> ArticleRecord {
    let publish_date = dates::normalize(&raw.date_text, formats);
    if dates::is_sentinel(&publish_date) {
        debug!(title = %raw.title, date_text = %raw.date_text, "Unparseable date; using sentinel");
    }
    ArticleRecord {
        url: raw.link,
        title: raw.title,
        source: raw.source,
        publish_date,
        summary: raw.summary,
        collected_at,
    }
}

/// Keep records published at or after `now - window`, preserving order.
#[instrument(level = "debug", skip(records))]
pub fn filter_recent(records: Vec<ArticleRecord>, now: DateTime<Utc>, window: Duration) -> Vec<ArticleRecord> {
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    records
        .into_iter()
        .filter(|r| r.publish_date >= cutoff)
        .collect()
}

/// Drop later records whose `key` was already seen. The first occurrence
/// wins, so concatenation order encodes priority.
pub fn dedup_by<K, F>(records: Vec<ArticleRecord>, key: F) -> Vec<ArticleRecord>
where
    K: Eq + Hash,
    F: FnMut(&ArticleRecord) -> K,
{
    records.into_iter().unique_by(key).collect()
}

/// Order most recent first. The sort is stable and the sentinel is the
/// smallest possible date, so undated records end up last in their
/// original relative order.
pub fn sort_by_recency(records: &mut [ArticleRecord]) {
    records.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
}

/// Dedup key of the scripted collector.
pub fn title_and_url(record: &ArticleRecord) -> (String, String) {
    (record.title.clone(), record.url.clone())
}

/// Dedup key of the merge stage.
pub fn url_only(record: &ArticleRecord) -> String {
    record.url.clone()
}
