// src/session.rs
//! One load cycle per process: an explicitly owned cache, visit tracker and
//! classifier wired together.

use std::sync::Arc;

use tracing::info;

use crate::analyze::ai_adapter::SentimentScorer;
use crate::analyze::rules::HappyRules;
use crate::article::Article;
use crate::cache::{CacheSettings, SentimentCache};
use crate::clock::Clock;
use crate::error::PipelineError;
use crate::ingest::ArticleSource;
use crate::pipeline::{Classifier, ClassifierSettings, ProgressListener};
use crate::storage::KvStore;
use crate::tracker::VisitTracker;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub cache: CacheSettings,
    pub classifier: ClassifierSettings,
    pub rules: HappyRules,
}

/// Result of [`Session::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// Happy articles, new first, then newest first.
    pub articles: Vec<Article>,
    pub divider_index: Option<usize>,
    /// Articles returned by the source.
    pub fetched: usize,
    /// Of those, how many were answered from the cache.
    pub cached: usize,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

pub struct Session {
    cache: Arc<SentimentCache>,
    tracker: VisitTracker,
    classifier: Classifier,
}

impl Session {
    /// Loads the cache and records this visit.
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, settings: SessionSettings) -> Self {
        let cache = Arc::new(SentimentCache::load(
            store.clone(),
            clock.clone(),
            settings.cache,
        ));
        let tracker = VisitTracker::start(store, clock.as_ref());
        let classifier = Classifier::new(cache.clone(), settings.rules, settings.classifier);
        Self {
            cache,
            tracker,
            classifier,
        }
    }

    pub fn cache(&self) -> &SentimentCache {
        &self.cache
    }

    pub fn tracker(&self) -> &VisitTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut VisitTracker {
        &mut self.tracker
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Fetch, classify, then flag and order by freshness.
    pub async fn load(
        &self,
        source: &dyn ArticleSource,
        scorer: &dyn SentimentScorer,
        listener: &dyn ProgressListener,
    ) -> Result<LoadOutcome, PipelineError> {
        // Fail fast on configuration before hitting the network.
        scorer.check_ready().map_err(PipelineError::config)?;

        let fetched = source.fetch_articles().await?;
        let fetched_count = fetched.len();
        let hits_before = self.cache.stats().hits;

        let happy = self.classifier.classify(fetched, scorer, listener).await?;
        let cached = usize::try_from(self.cache.stats().hits.saturating_sub(hits_before))
            .unwrap_or(usize::MAX);

        let articles = self.tracker.process_articles(happy);
        let divider_index = self.tracker.divider_index(&articles);
        info!(
            source = source.name(),
            scorer = scorer.name(),
            fetched = fetched_count,
            cached,
            happy = articles.len(),
            "load finished"
        );

        Ok(LoadOutcome {
            articles,
            divider_index,
            fetched: fetched_count,
            cached,
        })
    }
}
