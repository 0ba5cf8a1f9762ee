// src/cache.rs
//! Sentiment cache: fingerprint -> verdict, bounded, recency-evicted and
//! written through to durable storage.
//!
//! - Capacity defaults to 500 entries. Inserting a new key into a full cache
//!   first drops the least-recently-accessed quarter (at least one entry).
//! - Entries older than the retention window (24h) are not loaded at startup
//!   and are reported as absent by `has`/`get`.
//! - Every `put` persists the full snapshot. Storage failures are logged and
//!   otherwise ignored; the in-memory cache keeps working.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::article::{fingerprint, Article, SentimentVerdict, StoredVerdict, VerdictSource};
use crate::clock::Clock;
use crate::storage::KvStore;
use crate::telemetry::{
    ensure_metrics_described, CACHE_EVICTIONS, CACHE_HITS, CACHE_MISSES, CACHE_STORAGE_ERRORS,
};

/// Storage key for the serialized snapshot.
pub const CACHE_STORAGE_KEY: &str = "happytimes_article_cache";
pub const DEFAULT_MAX_SIZE: usize = 500;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_size: usize,
    pub retention: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// One cached verdict with its timestamps (epoch ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub verdict: StoredVerdict,
    pub created_at: i64,
    pub last_accessed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

pub struct SentimentCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    inner: Mutex<Inner>,
}

impl SentimentCache {
    /// Build the cache and load non-expired entries from `store`.
    ///
    /// A missing, unreadable or corrupt snapshot yields an empty cache.
    pub fn load(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, mut settings: CacheSettings) -> Self {
        ensure_metrics_described();
        if settings.max_size == 0 {
            settings.max_size = 1;
        }

        let now = clock.now_ms();
        let retention_ms = retention_ms(settings.retention);
        let mut entries = match store.get(CACHE_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&raw) {
                Ok(map) => map
                    .into_iter()
                    .filter(|(_, e)| is_live(e, now, retention_ms))
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "failed to parse persisted sentiment cache; starting empty");
                    counter!(CACHE_STORAGE_ERRORS).increment(1);
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "failed to load sentiment cache; starting empty");
                counter!(CACHE_STORAGE_ERRORS).increment(1);
                HashMap::new()
            }
        };

        if entries.len() > settings.max_size {
            let excess = entries.len() - settings.max_size;
            evict_least_recent(&mut entries, excess);
        }
        debug!(loaded = entries.len(), "sentiment cache loaded");

        Self {
            store,
            clock,
            settings,
            inner: Mutex::new(Inner {
                entries,
                ..Default::default()
            }),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// True iff a non-expired entry exists for the article's fingerprint.
    pub fn has(&self, article: &Article) -> bool {
        let key = fingerprint(article);
        let now = self.clock.now_ms();
        let inner = self.lock();
        inner
            .entries
            .get(&key)
            .is_some_and(|e| is_live(e, now, self.retention_ms()))
    }

    /// Cached verdict tagged `Cached`; refreshes the entry's last-accessed time.
    pub fn get(&self, article: &Article) -> Option<SentimentVerdict> {
        let key = fingerprint(article);
        let now = self.clock.now_ms();
        let retention_ms = self.retention_ms();
        let mut inner = self.lock();

        let found = match inner.entries.get_mut(&key) {
            Some(entry) if is_live(entry, now, retention_ms) => {
                entry.last_accessed = now;
                Some(entry.verdict.clone().into_verdict(VerdictSource::Cached))
            }
            _ => None,
        };

        if found.is_some() {
            inner.hits += 1;
            counter!(CACHE_HITS).increment(1);
        } else {
            inner.misses += 1;
            counter!(CACHE_MISSES).increment(1);
        }
        found
    }

    /// Store or overwrite the verdict for `article`, then persist the snapshot.
    pub fn put(&self, article: &Article, verdict: &SentimentVerdict) {
        let key = fingerprint(article);
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.settings.max_size {
            let quarter = (inner.entries.len() / 4).max(1);
            let removed = evict_least_recent(&mut inner.entries, quarter);
            counter!(CACHE_EVICTIONS).increment(removed as u64);
            debug!(removed, remaining = inner.entries.len(), "sentiment cache eviction");
        }

        inner.entries.insert(
            key,
            CacheEntry {
                verdict: StoredVerdict::from(verdict),
                created_at: now,
                last_accessed: now,
            },
        );

        self.persist(&inner.entries);
    }

    /// Drop every entry, in memory and in durable storage.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        if let Err(e) = self.store.remove(CACHE_STORAGE_KEY) {
            warn!(error = %e, "failed to remove persisted sentiment cache");
            counter!(CACHE_STORAGE_ERRORS).increment(1);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            size: inner.entries.len(),
            max_size: self.settings.max_size,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Snapshot of the raw entry for `article`, expired or not.
    pub fn entry(&self, article: &Article) -> Option<CacheEntry> {
        self.lock().entries.get(&fingerprint(article)).cloned()
    }

    // -- internals --

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn retention_ms(&self) -> i64 {
        retention_ms(self.settings.retention)
    }

    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        let result = serde_json::to_string(entries)
            .map_err(crate::error::StorageError::from)
            .and_then(|json| self.store.set(CACHE_STORAGE_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist sentiment cache");
            counter!(CACHE_STORAGE_ERRORS).increment(1);
        }
    }
}

fn retention_ms(retention: Duration) -> i64 {
    i64::try_from(retention.as_millis()).unwrap_or(i64::MAX)
}

fn is_live(entry: &CacheEntry, now: i64, retention_ms: i64) -> bool {
    entry.created_at > now.saturating_sub(retention_ms)
}

/// Remove the `n` entries with the oldest `last_accessed` (ties: older
/// `created_at`, then key). Returns how many were removed.
fn evict_least_recent(entries: &mut HashMap<String, CacheEntry>, n: usize) -> usize {
    let mut order: Vec<(i64, i64, String)> = entries
        .iter()
        .map(|(k, e)| (e.last_accessed, e.created_at, k.clone()))
        .collect();
    order.sort();

    let mut removed = 0;
    for (_, _, key) in order.into_iter().take(n) {
        if entries.remove(&key).is_some() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryKvStore;

    const HOUR_MS: i64 = 3_600_000;

    fn article(n: usize) -> Article {
        Article::new(format!("id-{n}"), format!("Headline {n}"), "abstract", None)
    }

    fn verdict() -> SentimentVerdict {
        SentimentVerdict::fresh(8, true, "kind")
    }

    fn setup(max_size: usize) -> (Arc<MemoryKvStore>, Arc<ManualClock>, SentimentCache) {
        let store = Arc::new(MemoryKvStore::new());
        let clock = Arc::new(ManualClock::new(10 * HOUR_MS));
        let cache = SentimentCache::load(
            store.clone(),
            clock.clone(),
            CacheSettings {
                max_size,
                ..Default::default()
            },
        );
        (store, clock, cache)
    }

    #[test]
    fn put_then_get_returns_cached_copy() {
        let (_, _, cache) = setup(10);
        let a = article(1);
        assert!(!cache.has(&a));
        assert_eq!(cache.get(&a), None);

        cache.put(&a, &verdict());
        assert!(cache.has(&a));
        let got = cache.get(&a).unwrap();
        assert_eq!(got, verdict().tagged(VerdictSource::Cached));
    }

    #[test]
    fn get_refreshes_last_accessed_only() {
        let (_, clock, cache) = setup(10);
        let a = article(1);
        cache.put(&a, &verdict());
        clock.advance(5_000);
        cache.get(&a);
        let e = cache.entry(&a).unwrap();
        assert_eq!(e.last_accessed, e.created_at + 5_000);
    }

    #[test]
    fn eviction_drops_least_recently_accessed_quarter() {
        let (_, clock, cache) = setup(8);
        for i in 0..8 {
            cache.put(&article(i), &verdict());
            clock.advance(10);
        }
        // Touch 0 and 1 so that 2 and 3 become the least recent.
        cache.get(&article(0));
        cache.get(&article(1));
        clock.advance(10);

        cache.put(&article(100), &verdict());
        assert_eq!(cache.len(), 7);
        assert!(!cache.has(&article(2)));
        assert!(!cache.has(&article(3)));
        assert!(cache.has(&article(0)));
        assert!(cache.has(&article(1)));
        assert!(cache.has(&article(100)));
    }

    #[test]
    fn eviction_removes_at_least_one_entry() {
        let (_, clock, cache) = setup(2);
        cache.put(&article(1), &verdict());
        clock.advance(1);
        cache.put(&article(2), &verdict());
        clock.advance(1);
        cache.put(&article(3), &verdict());
        assert_eq!(cache.len(), 2);
        assert!(!cache.has(&article(1)));
    }

    #[test]
    fn overwrite_at_capacity_does_not_evict() {
        let (_, _, cache) = setup(2);
        cache.put(&article(1), &verdict());
        cache.put(&article(2), &verdict());
        cache.put(&article(2), &SentimentVerdict::fresh(3, false, "changed"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&article(2)).unwrap().score, 3);
    }

    #[test]
    fn size_never_exceeds_max() {
        let (_, clock, cache) = setup(5);
        for i in 0..50 {
            cache.put(&article(i), &verdict());
            clock.advance(1);
            assert!(cache.len() <= 5);
        }
    }

    #[test]
    fn expired_entries_are_absent() {
        let (_, clock, cache) = setup(10);
        let a = article(1);
        cache.put(&a, &verdict());
        clock.advance(25 * HOUR_MS);
        assert!(!cache.has(&a));
        assert_eq!(cache.get(&a), None);
    }

    #[test]
    fn clear_empties_memory_and_storage() {
        let (store, _, cache) = setup(10);
        cache.put(&article(1), &verdict());
        assert!(store.get(CACHE_STORAGE_KEY).unwrap().is_some());
        cache.clear();
        assert!(cache.is_empty());
        assert!(store.get(CACHE_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let (_, _, cache) = setup(10);
        cache.put(&article(1), &verdict());
        cache.get(&article(1));
        cache.get(&article(2));
        let s = cache.stats();
        assert_eq!((s.size, s.max_size, s.hits, s.misses), (1, 10, 1, 1));
        assert!((s.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn storage_failure_keeps_memory_working() {
        let (store, _, cache) = setup(10);
        store.set_unavailable(true);
        cache.put(&article(1), &verdict());
        assert!(cache.has(&article(1)));
        cache.clear();
        assert!(cache.is_empty());
    }
}
