//! Error types shared by the pipeline stages.
//!
//! Stage entry points return [`BoxError`] so that library errors (reqwest,
//! csv, io) propagate with `?`. The failures the pipeline itself decides on
//! are spelled out in [`PipelineError`].

use thiserror::Error;

/// Boxed error used by every stage entry point.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A dataset the merge stage depends on has not been produced.
    #[error("merge input not found: {path}")]
    MissingInput { path: String },

    #[error("model API error (status {status}): {message}")]
    ModelApi { status: u16, message: String },

    #[error("model returned no usable content for {source_url}")]
    EmptyModelResponse { source_url: String },

    #[error("no API key configured for the remote model (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("browser session failed: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("stage `{stage}` exited with {status}")]
    ChildFailed { stage: String, status: String },
}
