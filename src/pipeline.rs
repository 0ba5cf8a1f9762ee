// src/pipeline.rs
//! Classification orchestrator.
//!
//! Order of work:
//! 1) split input into cache hits and misses (input order kept in both),
//! 2) hits are annotated and filtered immediately,
//! 3) misses are scored in batches; calls inside a batch run concurrently and
//!    are consumed in settle order, with a pause between batches.
//!
//! A progress event follows every processed article. Only the orchestrator
//! writes to the cache and appends to the running result.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::analyze::ai_adapter::SentimentScorer;
use crate::analyze::rules::HappyRules;
use crate::article::{Article, SentimentVerdict, VerdictSource};
use crate::cache::SentimentCache;
use crate::error::PipelineError;
use crate::telemetry::{ensure_metrics_described, FRESH_SCORES, HAPPY_ARTICLES, SCORE_FAILURES};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierSettings {
    pub batch_size: usize,
    /// Pause between two batches of scoring calls. Not applied after the last.
    pub batch_delay: Duration,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// Snapshot published after each processed article.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    /// How many of the processed articles were answered from cache.
    pub cached: usize,
    /// Happy set so far, in arrival order.
    pub happy: Vec<Article>,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressListener for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_progress(&self, _progress: &Progress) {}
}

/// Forwards events into an unbounded channel. A dropped receiver is ignored,
/// which is how a caller stops listening to a load it no longer cares about.
#[derive(Debug, Clone)]
pub struct ProgressChannel(mpsc::UnboundedSender<Progress>);

impl ProgressChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl ProgressListener for ProgressChannel {
    fn on_progress(&self, progress: &Progress) {
        let _ = self.0.send(progress.clone());
    }
}

pub struct Classifier {
    cache: Arc<SentimentCache>,
    rules: HappyRules,
    settings: ClassifierSettings,
}

#[derive(Default)]
struct Run {
    total: usize,
    processed: usize,
    cached: usize,
    happy: Vec<Article>,
}

impl Run {
    fn snapshot(&self) -> Progress {
        Progress {
            processed: self.processed,
            total: self.total,
            cached: self.cached,
            happy: self.happy.clone(),
        }
    }
}

impl Classifier {
    pub fn new(cache: Arc<SentimentCache>, rules: HappyRules, mut settings: ClassifierSettings) -> Self {
        ensure_metrics_described();
        settings.batch_size = settings.batch_size.max(1);
        Self {
            cache,
            rules,
            settings,
        }
    }

    pub fn settings(&self) -> ClassifierSettings {
        self.settings
    }

    pub fn rules(&self) -> &HappyRules {
        &self.rules
    }

    /// Classify `articles` and return the happy subset, each annotated with
    /// its verdict.
    ///
    /// Fails only on configuration problems of the scorer, checked before any
    /// article is touched. Individual scoring failures drop that article.
    pub async fn classify(
        &self,
        articles: Vec<Article>,
        scorer: &dyn SentimentScorer,
        listener: &dyn ProgressListener,
    ) -> Result<Vec<Article>, PipelineError> {
        scorer.check_ready().map_err(PipelineError::config)?;

        let mut run = Run {
            total: articles.len(),
            ..Default::default()
        };
        if articles.is_empty() {
            listener.on_progress(&run.snapshot());
            return Ok(Vec::new());
        }

        // `get` rather than `has` + `get`, so an entry cannot expire in between.
        let mut hits = Vec::new();
        let mut misses = Vec::new();
        for article in articles {
            match self.cache.get(&article) {
                Some(verdict) => hits.push((article, verdict)),
                None => misses.push(article),
            }
        }
        debug!(
            hits = hits.len(),
            misses = misses.len(),
            scorer = scorer.name(),
            "classification started"
        );

        for (article, verdict) in hits {
            run.cached += 1;
            self.admit(article, verdict, &mut run);
            run.processed += 1;
            listener.on_progress(&run.snapshot());
        }

        let batch_size = self.settings.batch_size;
        let mut queue = misses.into_iter().peekable();
        let mut batch_no = 0usize;
        while queue.peek().is_some() {
            let batch: Vec<Article> = queue.by_ref().take(batch_size).collect();
            batch_no += 1;
            debug!(batch = batch_no, size = batch.len(), "scoring batch");

            let mut pending: FuturesUnordered<_> = batch
                .into_iter()
                .map(|article| async move {
                    let result = scorer.score(&article).await;
                    (article, result)
                })
                .collect();

            while let Some((article, result)) = pending.next().await {
                match result {
                    Ok(verdict) => {
                        let verdict = verdict.tagged(VerdictSource::Fresh);
                        self.cache.put(&article, &verdict);
                        counter!(FRESH_SCORES).increment(1);
                        self.admit(article, verdict, &mut run);
                    }
                    Err(e) if e.is_config() => return Err(PipelineError::config(e)),
                    Err(e) => {
                        warn!(article_id = %article.id, error = ?e, "sentiment scoring failed; article skipped");
                        counter!(SCORE_FAILURES).increment(1);
                    }
                }
                run.processed += 1;
                listener.on_progress(&run.snapshot());
            }

            if queue.peek().is_some() && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        debug!(
            total = run.total,
            cached = run.cached,
            happy = run.happy.len(),
            "classification finished"
        );
        Ok(run.happy)
    }

    fn admit(&self, article: Article, verdict: SentimentVerdict, run: &mut Run) {
        match self.rules.evaluate(&article, &verdict) {
            Ok(()) => {
                counter!(HAPPY_ARTICLES).increment(1);
                run.happy.push(article.with_sentiment(verdict));
            }
            Err(reason) => {
                debug!(article_id = %article.id, ?reason, "not a happy article");
            }
        }
    }
}
