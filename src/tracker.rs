// src/tracker.rs
//! "New since last visit" tracking.
//!
//! The persisted marker is read once when the tracker starts and immediately
//! overwritten with the current time, so the baseline for this process is the
//! previous visit and the next process will see this one.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::warn;

use crate::article::Article;
use crate::clock::Clock;
use crate::storage::KvStore;

/// Storage key for the last-visit marker (epoch ms as a decimal string).
pub const LAST_VISIT_STORAGE_KEY: &str = "happytimes_last_visit";

pub struct VisitTracker {
    store: Arc<dyn KvStore>,
    last_visit_ms: i64,
}

impl VisitTracker {
    /// Snapshot the previous visit, then record "now" for the next process.
    pub fn start(store: Arc<dyn KvStore>, clock: &dyn Clock) -> Self {
        let last_visit_ms = read_last_visit(store.as_ref());
        let now = clock.now_ms();
        if let Err(e) = store.set(LAST_VISIT_STORAGE_KEY, &now.to_string()) {
            warn!(error = %e, "failed to update last visit time");
        }
        Self {
            store,
            last_visit_ms,
        }
    }

    /// Baseline captured at startup.
    pub fn last_visit_ms(&self) -> i64 {
        self.last_visit_ms
    }

    /// Published strictly after the baseline. Undated articles are never new.
    pub fn is_new_article(&self, article: &Article) -> bool {
        article
            .published_ms()
            .is_some_and(|t| t > self.last_visit_ms)
    }

    /// Annotate `is_new` and sort: new first, then newest first.
    pub fn process_articles(&self, articles: Vec<Article>) -> Vec<Article> {
        let mut out: Vec<Article> = articles
            .into_iter()
            .map(|a| {
                let is_new = self.is_new_article(&a);
                a.with_is_new(is_new)
            })
            .collect();
        out.sort_by(compare_for_display);
        out
    }

    /// Index of the first old article in an annotated, sorted list, when it
    /// sits strictly between a non-empty new prefix and a non-empty old suffix.
    pub fn divider_index(&self, articles: &[Article]) -> Option<usize> {
        divider_index(articles)
    }

    /// Forget the persisted marker; everything dated becomes new.
    pub fn reset(&mut self) {
        if let Err(e) = self.store.remove(LAST_VISIT_STORAGE_KEY) {
            warn!(error = %e, "failed to reset new article tracker");
        }
        self.last_visit_ms = 0;
    }
}

/// See [`VisitTracker::divider_index`].
pub fn divider_index(articles: &[Article]) -> Option<usize> {
    match articles.iter().position(|a| !a.is_new) {
        Some(i) if i > 0 => Some(i),
        _ => None,
    }
}

fn compare_for_display(a: &Article, b: &Article) -> Ordering {
    b.is_new
        .cmp(&a.is_new)
        .then_with(|| match (a.published_ms(), b.published_ms()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

fn read_last_visit(store: &dyn KvStore) -> i64 {
    match store.get(LAST_VISIT_STORAGE_KEY) {
        Ok(Some(raw)) => raw.trim().parse::<i64>().unwrap_or_else(|_| {
            warn!(value = %raw, "unparseable last visit time; treating as never visited");
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            warn!(error = %e, "failed to get last visit time");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryKvStore;
    use chrono::{TimeZone, Utc};

    fn at(ms: i64) -> Article {
        Article::new(
            format!("a{ms}"),
            "h",
            "a",
            Some(Utc.timestamp_millis_opt(ms).unwrap()),
        )
    }

    fn flagged(n_new: usize, n_old: usize) -> Vec<Article> {
        let mut v = Vec::new();
        for i in 0..n_new {
            v.push(at(i as i64).with_is_new(true));
        }
        for i in 0..n_old {
            v.push(at(i as i64).with_is_new(false));
        }
        v
    }

    #[test]
    fn divider_sits_between_new_and_old() {
        assert_eq!(divider_index(&flagged(5, 3)), Some(5));
        assert_eq!(divider_index(&flagged(8, 0)), None);
        assert_eq!(divider_index(&flagged(0, 8)), None);
        assert_eq!(divider_index(&[]), None);
    }

    #[test]
    fn start_reads_then_overwrites_marker() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(LAST_VISIT_STORAGE_KEY, "1000").unwrap();
        let clock = ManualClock::new(5_000);

        let t = VisitTracker::start(store.clone(), &clock);
        assert_eq!(t.last_visit_ms(), 1_000);
        assert_eq!(
            store.get(LAST_VISIT_STORAGE_KEY).unwrap().as_deref(),
            Some("5000")
        );

        // A second tracker in the same process sees this session's start.
        let t2 = VisitTracker::start(store, &clock);
        assert_eq!(t2.last_visit_ms(), 5_000);
    }

    #[test]
    fn is_new_is_strictly_after_baseline() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(LAST_VISIT_STORAGE_KEY, "1000").unwrap();
        let t = VisitTracker::start(store, &ManualClock::new(9_999));
        assert!(!t.is_new_article(&at(1_000)));
        assert!(t.is_new_article(&at(1_001)));
        assert!(!t.is_new_article(&Article::new("x", "h", "a", None)));
    }

    #[test]
    fn process_sorts_new_first_then_newest() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(LAST_VISIT_STORAGE_KEY, "1000").unwrap();
        let t = VisitTracker::start(store, &ManualClock::new(9_999));

        let out = t.process_articles(vec![at(500), at(2_000), at(900), at(3_000)]);
        let order: Vec<i64> = out.iter().filter_map(Article::published_ms).collect();
        assert_eq!(order, vec![3_000, 2_000, 900, 500]);
        assert_eq!(
            out.iter().map(|a| a.is_new).collect::<Vec<_>>(),
            vec![true, true, false, false]
        );
        assert_eq!(t.divider_index(&out), Some(2));
    }

    #[test]
    fn garbage_or_missing_marker_means_zero() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(LAST_VISIT_STORAGE_KEY, "not-a-number").unwrap();
        let t = VisitTracker::start(store.clone(), &ManualClock::new(1));
        assert_eq!(t.last_visit_ms(), 0);

        store.set_unavailable(true);
        let t = VisitTracker::start(store, &ManualClock::new(1));
        assert_eq!(t.last_visit_ms(), 0);
    }

    #[test]
    fn reset_clears_marker() {
        let store = Arc::new(MemoryKvStore::new());
        let mut t = VisitTracker::start(store.clone(), &ManualClock::new(42));
        t.reset();
        assert_eq!(t.last_visit_ms(), 0);
        assert!(store.get(LAST_VISIT_STORAGE_KEY).unwrap().is_none());
    }
}
