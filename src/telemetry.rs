// src/telemetry.rs
//! Metric names emitted through the `metrics` facade. The crate installs no
//! recorder; a host application may.

use metrics::describe_counter;
use once_cell::sync::OnceCell;

pub const CACHE_HITS: &str = "sentiment_cache_hits_total";
pub const CACHE_MISSES: &str = "sentiment_cache_misses_total";
pub const CACHE_EVICTIONS: &str = "sentiment_cache_evictions_total";
pub const CACHE_STORAGE_ERRORS: &str = "sentiment_cache_storage_errors_total";
pub const SCORE_FAILURES: &str = "sentiment_score_failures_total";
pub const FRESH_SCORES: &str = "sentiment_fresh_scores_total";
pub const HAPPY_ARTICLES: &str = "happy_articles_total";

/// One-time metrics registration (so series carry descriptions).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(CACHE_HITS, "Sentiment cache lookups answered from cache.");
        describe_counter!(CACHE_MISSES, "Sentiment cache lookups that missed.");
        describe_counter!(CACHE_EVICTIONS, "Entries evicted under size pressure.");
        describe_counter!(
            CACHE_STORAGE_ERRORS,
            "Durable storage reads/writes that failed and were skipped."
        );
        describe_counter!(SCORE_FAILURES, "Scoring calls that failed per article.");
        describe_counter!(FRESH_SCORES, "Verdicts obtained from the scoring service.");
        describe_counter!(HAPPY_ARTICLES, "Articles that passed the happy filter.");
    });
}
