//! Merge stage.
//!
//! Reconciles the AI-assisted and scripted datasets into the merged dataset:
//! scripted `link`/`published_at` become `url`/`publish_date`, AI rows get the
//! summary placeholder and the merge time as `collected_at`, AI rows come
//! first so they win every `url` collision, and every `publish_date` goes
//! through the shared normalizer before the newest-first sort.

use crate::config::Config;
use crate::dates::{self, ALL_FORMATS};
use crate::error::BoxError;
use crate::models::{AiArticle, ArticleRecord, MERGED_COLUMNS, NO_SUMMARY, ScriptedRow};
use crate::outputs::dataset;
use crate::pipeline::{dedup_by, sort_by_recency, url_only};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

impl AiArticle {
    /// Backfill the columns the AI-assisted dataset lacks.
    pub fn into_record(self, merged_at: DateTime<Utc>) -> ArticleRecord {
        ArticleRecord {
            publish_date: dates::normalize(self.publish_date.as_deref().unwrap_or_default(), ALL_FORMATS),
            url: self.url,
            title: self.title,
            source: self.source,
            summary: NO_SUMMARY.to_string(),
            collected_at: merged_at,
        }
    }
}

impl ScriptedRow {
    /// Map the scripted collector's columns onto the merged schema.
    pub fn into_record(self) -> ArticleRecord {
        ArticleRecord {
            url: self.link,
            title: self.title,
            source: self.source,
            publish_date: dates::normalize(&self.published_at, ALL_FORMATS),
            summary: self.summary,
            collected_at: dates::normalize(&self.collected_at, ALL_FORMATS),
        }
    }
}

/// Combine both datasets. `ai` takes precedence over `scripted` on `url`.
pub fn merge(ai: Vec<AiArticle>, scripted: Vec<ScriptedRow>, merged_at: DateTime<Utc>) -> Vec<ArticleRecord> {
    let combined: Vec<ArticleRecord> = ai
        .into_iter()
        .map(|a| a.into_record(merged_at))
        .chain(scripted.into_iter().map(ScriptedRow::into_record))
        .collect();

    let mut merged = dedup_by(combined, url_only);
    sort_by_recency(&mut merged);
    merged
}

/// The `merge` stage end to end: read both collector datasets, combine them
/// with [`merge`] and rewrite the merged dataset.
///
/// # Arguments
///
/// * `config` - Supplies the AI, scripted and merged dataset paths
///
/// # Returns
///
/// The number of records in the merged dataset.
///
/// # Errors
///
/// Returns [`crate::error::PipelineError::MissingInput`] if either input
/// dataset does not exist, and an error if a file cannot be parsed or
/// written. Nothing is written when an input is missing.
///
/// # Examples
///
/// ```ignore
/// let merged = merge::run(&config)?;
/// ```
#[instrument(level = "info", skip_all)]
pub fn run(config: &Config) -> Result<usize, BoxError> {
    let ai: Vec<AiArticle> = dataset::read_rows(&config.paths.ai_dataset)?;
    let scripted: Vec<ScriptedRow> = dataset::read_rows(&config.paths.scripted_dataset)?;
    let (ai_count, scripted_count) = (ai.len(), scripted.len());

    let merged = merge(ai, scripted, Utc::now());
    dataset::write_rows(&config.paths.merged_dataset, &merged, MERGED_COLUMNS)?;
    info!(
        ai = ai_count,
        scripted = scripted_count,
        merged = merged.len(),
        path = %config.paths.merged_dataset.display(),
        "Saved combined articles"
    );
    Ok(merged.len())
}
