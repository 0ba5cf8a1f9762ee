// src/error.rs
//! Error taxonomy for the load cycle.
//!
//! Only configuration errors (and a failed article fetch) abort a whole load.
//! Scoring and storage failures are contained where they happen.

use thiserror::Error;

/// Failure of a single call to a sentiment scorer.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("sentiment API key not configured")]
    MissingApiKey,

    #[error("unsupported sentiment provider: {0}")]
    UnknownProvider(String),

    #[error("sentiment HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sentiment service returned status {0}")]
    Status(u16),

    #[error("unparseable sentiment reply: {0}")]
    Parse(String),

    #[error("sentiment scorer unavailable: {0}")]
    Unavailable(String),
}

impl ScoreError {
    /// Configuration-class failures abort the whole operation; everything else
    /// only drops the article being scored.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::UnknownProvider(_))
    }
}

/// Failure of the article source adapter.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("article source API key is required")]
    MissingApiKey,

    #[error("article source HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("article source returned status {0}")]
    Status(u16),

    #[error("article source payload could not be decoded: {0}")]
    Decode(String),
}

/// Failure of the durable key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Whole-operation failure surfaced to the caller of a load cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Source(SourceError),
}

impl From<SourceError> for PipelineError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::MissingApiKey => Self::Config(e.to_string()),
            other => Self::Source(other),
        }
    }
}

impl PipelineError {
    /// Wraps a configuration-class scorer failure. Callers check
    /// [`ScoreError::is_config`] first; per-article failures never get here.
    pub fn config(e: ScoreError) -> Self {
        Self::Config(e.to_string())
    }
}
