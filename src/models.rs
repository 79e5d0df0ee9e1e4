//! Data models for collected articles and the rows of each persisted dataset.
//!
//! - [`RawRecord`]: what a site extractor pulls out of a page, dates still text
//! - [`ArticleRecord`]: a normalized article, the row shape of the merged dataset
//! - [`ScriptedRow`]: row shape of the scripted collector's dataset
//! - [`AiArticle`]: one article as returned by the remote model, also the row
//!   shape of the AI-assisted dataset

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for an entry without a date element.
pub const NO_DATE: &str = "No date";
/// Placeholder for an entry without a summary element.
pub const NO_SUMMARY: &str = "No summary available";

/// Column order of the scripted collector's dataset.
pub const SCRIPTED_COLUMNS: &[&str] = &["title", "link", "date", "summary", "source", "published_at", "collected_at"];
/// Column order of the AI-assisted dataset.
pub const AI_COLUMNS: &[&str] = &["url", "title", "source", "publish_date"];
/// Column order of the merged dataset.
pub const MERGED_COLUMNS: &[&str] = &["url", "title", "source", "publish_date", "summary", "collected_at"];

/// An article as located on a source page, before date normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub title: String,
    /// Absolute article URL.
    pub link: String,
    /// Date exactly as found on the page, or [`NO_DATE`].
    pub date_text: String,
    pub summary: String,
    /// URL of the listing page the entry came from.
    pub source: String,
}

/// A normalized article.
///
/// `url` is the identity of an article across datasets. `publish_date` is
/// always a valid instant; unknown dates carry [`crate::dates::SENTINEL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub source: String,
    #[serde(with = "crate::dates::canonical")]
    pub publish_date: DateTime<Utc>,
    pub summary: String,
    #[serde(with = "crate::dates::canonical")]
    pub collected_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// Whether the publish date was actually known.
    pub fn has_date(&self) -> bool {
        !crate::dates::is_sentinel(&self.publish_date)
    }
}

/// One row of the scripted collector's dataset.
///
/// Column names follow the collector's own vocabulary (`link`,
/// `published_at`); the merge stage maps them onto [`ArticleRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedRow {
    pub title: String,
    pub link: String,
    /// Short `YYYY-MM-DD` publish date, or the no-date placeholder.
    pub date: String,
    pub summary: String,
    pub source: String,
    pub published_at: String,
    pub collected_at: String,
}

impl From<&ArticleRecord> for ScriptedRow {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            title: record.title.clone(),
            link: record.url.clone(),
            date: crate::dates::display_date(&record.publish_date),
            summary: record.summary.clone(),
            source: record.source.clone(),
            published_at: crate::dates::to_canonical(&record.publish_date),
            collected_at: crate::dates::to_canonical(&record.collected_at),
        }
    }
}

/// An article as described by the remote model.
///
/// `publish_date` is whatever the model produced (asked for `YYYY-MM-DD`);
/// it is stored verbatim and only normalized in the merge stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiArticle {
    pub url: String,
    pub title: String,
    pub source: String,
    pub publish_date: Option<String>,
}

/// Response envelope requested from the model.
#[derive(Debug, Deserialize)]
pub struct AiArticles {
    pub articles: Vec<AiArticle>,
}
