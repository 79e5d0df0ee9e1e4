//! CSV persistence for datasets.
//!
//! Datasets are rebuilt wholesale every run: [`write_rows`] truncates the
//! target file, there is no append mode. Column order follows the field order
//! of the row type.

use crate::error::{BoxError, PipelineError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

/// Serialize `rows` to `path`, replacing any previous content. Parent
/// directories are created as needed. A header row is written even when
/// `rows` is empty.
#[instrument(level = "info", skip(rows), fields(path = %path.display()))]
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<(), BoxError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(count = rows.len(), "Wrote dataset");
    Ok(())
}

/// Read every row of the dataset at `path`.
///
/// A missing file is reported as [`PipelineError::MissingInput`] so callers
/// can tell "not produced yet" apart from a malformed file.
#[instrument(level = "info", fields(path = %path.display()))]
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, BoxError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput {
            path: path.display().to_string(),
        }
        .into());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    info!(count = rows.len(), "Read dataset");
    Ok(rows)
}
