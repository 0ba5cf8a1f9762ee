// tests/session_load.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use happy_news::ai_adapter::{MockScorer, SentimentScorer};
use happy_news::clock::ManualClock;
use happy_news::ingest::{ArticleSource, StaticSource};
use happy_news::pipeline::{ClassifierSettings, NoProgress, ProgressChannel};
use happy_news::storage::{KvStore, MemoryKvStore};
use happy_news::tracker::LAST_VISIT_STORAGE_KEY;
use happy_news::{
    Article, PipelineError, ScoreError, SentimentVerdict, Session, SessionSettings, SourceError,
};

const HOUR_MS: i64 = 3_600_000;

fn settings() -> SessionSettings {
    SessionSettings {
        classifier: ClassifierSettings {
            batch_size: 5,
            batch_delay: Duration::ZERO,
        },
        ..Default::default()
    }
}

fn at_hour(id: &str, headline: &str, hour: i64) -> Article {
    Article::new(
        id,
        headline,
        "Neighbors smile",
        Some(Utc.timestamp_millis_opt(hour * HOUR_MS).unwrap()),
    )
}

fn feed() -> StaticSource {
    StaticSource {
        articles: vec![
            at_hour("old-good", "Park restored", 8),
            at_hour("new-good", "Choir sings again", 12),
            at_hour("new-bad", "Storm knocks out power", 11),
            at_hour("newer-good", "Bakery shares bread", 13),
        ],
    }
}

/// Counts fetches so tests can tell whether the source was reached.
struct CountingSource {
    inner: StaticSource,
    fetches: AtomicUsize,
}

#[async_trait]
impl ArticleSource for CountingSource {
    async fn fetch_articles(&self) -> Result<Vec<Article>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_articles().await
    }
    fn name(&self) -> &'static str {
        "counting"
    }
}

struct FailingSource;

#[async_trait]
impl ArticleSource for FailingSource {
    async fn fetch_articles(&self) -> Result<Vec<Article>, SourceError> {
        Err(SourceError::Status(503))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

struct KeylessScorer;

#[async_trait]
impl SentimentScorer for KeylessScorer {
    async fn score(&self, _a: &Article) -> Result<SentimentVerdict, ScoreError> {
        Err(ScoreError::MissingApiKey)
    }
    fn check_ready(&self) -> Result<(), ScoreError> {
        Err(ScoreError::MissingApiKey)
    }
    fn name(&self) -> &'static str {
        "keyless"
    }
}

fn store_with_last_visit(hour: i64) -> Arc<MemoryKvStore> {
    let store = Arc::new(MemoryKvStore::new());
    store
        .set(LAST_VISIT_STORAGE_KEY, &(hour * HOUR_MS).to_string())
        .unwrap();
    store
}

#[tokio::test]
async fn load_classifies_flags_and_orders() {
    let store = store_with_last_visit(10);
    let clock = Arc::new(ManualClock::new(14 * HOUR_MS));
    let session = Session::new(store, clock, settings());

    let (listener, mut rx) = ProgressChannel::new();
    let outcome = session
        .load(&feed(), &MockScorer::default(), &listener)
        .await
        .unwrap();

    let ids: Vec<&str> = outcome.articles.iter().map(|a| a.id.as_str()).collect();
    // "Storm" is a negative keyword; new ones first, newest first.
    assert_eq!(ids, vec!["newer-good", "new-good", "old-good"]);
    assert_eq!(outcome.divider_index, Some(2));
    assert_eq!(outcome.fetched, 4);
    assert_eq!(outcome.cached, 0);

    let mut events = 0;
    while rx.try_recv().is_ok() {
        events += 1;
    }
    assert_eq!(events, 4);
}

#[tokio::test]
async fn second_session_reuses_cached_verdicts() {
    let store = store_with_last_visit(10);
    let clock = Arc::new(ManualClock::new(14 * HOUR_MS));

    let first = Session::new(store.clone(), clock.clone(), settings());
    first
        .load(&feed(), &MockScorer::default(), &NoProgress)
        .await
        .unwrap();
    drop(first);

    clock.advance(HOUR_MS);
    let second = Session::new(store, clock, settings());
    // The first session's start is now the baseline: nothing is new.
    assert_eq!(second.tracker().last_visit_ms(), 14 * HOUR_MS);

    let rejecting = MockScorer {
        fixed: SentimentVerdict::fresh(1, false, "would reject"),
    };
    let outcome = second.load(&feed(), &rejecting, &NoProgress).await.unwrap();
    assert_eq!(outcome.cached, 4);
    assert_eq!(outcome.articles.len(), 3);
    assert_eq!(outcome.divider_index, None);
    assert!(outcome.articles.iter().all(|a| !a.is_new));
}

#[tokio::test]
async fn missing_scorer_key_aborts_before_fetching() {
    let session = Session::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(ManualClock::new(HOUR_MS)),
        settings(),
    );
    let source = CountingSource {
        inner: feed(),
        fetches: AtomicUsize::new(0),
    };

    let err = session
        .load(&source, &KeylessScorer, &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn source_failure_is_surfaced() {
    let session = Session::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(ManualClock::new(HOUR_MS)),
        settings(),
    );
    let err = session
        .load(&FailingSource, &MockScorer::default(), &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Source(SourceError::Status(503))));
}

#[tokio::test]
async fn empty_feed_is_not_an_error() {
    let session = Session::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(ManualClock::new(HOUR_MS)),
        settings(),
    );
    let outcome = session
        .load(&StaticSource::default(), &MockScorer::default(), &NoProgress)
        .await
        .unwrap();
    assert!(outcome.is_empty());
    assert_eq!(outcome.divider_index, None);
}
