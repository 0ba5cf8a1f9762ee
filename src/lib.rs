// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod article;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod pipeline;
pub mod sentiment;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use article::{fingerprint, Article, SentimentVerdict, VerdictSource};
pub use cache::{CacheSettings, CacheStats, SentimentCache};
pub use error::{PipelineError, ScoreError, SourceError, StorageError};
pub use pipeline::{Classifier, ClassifierSettings, Progress, ProgressListener};
pub use session::{LoadOutcome, Session, SessionSettings};
pub use tracker::VisitTracker;
