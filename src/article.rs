// src/article.rs
//! Article shape consumed by the classification pipeline, the sentiment verdict
//! attached to it, and the content fingerprint used for cache addressing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where a verdict came from for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Cached,
    Fresh,
}

/// Sentiment classification of one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    /// 1 = very negative, 5 = neutral, 10 = very positive.
    pub score: u8,
    pub is_uplifting: bool,
    pub reasoning: String,
    pub source: VerdictSource,
}

impl SentimentVerdict {
    pub fn fresh(score: u8, is_uplifting: bool, reasoning: impl Into<String>) -> Self {
        Self {
            score: score.clamp(1, 10),
            is_uplifting,
            reasoning: reasoning.into(),
            source: VerdictSource::Fresh,
        }
    }

    /// Same verdict, re-tagged.
    pub fn tagged(mut self, source: VerdictSource) -> Self {
        self.source = source;
        self
    }
}

/// Verdict as stored in the cache (no per-request `source` tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVerdict {
    pub score: u8,
    pub is_uplifting: bool,
    pub reasoning: String,
}

impl StoredVerdict {
    pub fn into_verdict(self, source: VerdictSource) -> SentimentVerdict {
        SentimentVerdict {
            score: self.score,
            is_uplifting: self.is_uplifting,
            reasoning: self.reasoning,
            source,
        }
    }
}

impl From<&SentimentVerdict> for StoredVerdict {
    fn from(v: &SentimentVerdict) -> Self {
        Self {
            score: v.score,
            is_uplifting: v.is_uplifting,
            reasoning: v.reasoning.clone(),
        }
    }
}

/// A normalized news article.
///
/// Fetched fields never change; `sentiment` and `is_new` are attached by the
/// pipeline through the `with_*` copy-with-update helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub headline: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub byline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentVerdict>,
    #[serde(default)]
    pub is_new: bool,
}

fn default_language() -> String {
    "en".to_string()
}

impl Article {
    /// Minimal constructor; optional fields start empty.
    pub fn new(
        id: impl Into<String>,
        headline: impl Into<String>,
        abstract_text: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            headline: headline.into(),
            abstract_text: abstract_text.into(),
            url: None,
            published_at,
            section: None,
            language: default_language(),
            thumbnail: None,
            byline: None,
            sentiment: None,
            is_new: false,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_sentiment(mut self, verdict: SentimentVerdict) -> Self {
        self.sentiment = Some(verdict);
        self
    }

    pub fn with_is_new(mut self, is_new: bool) -> Self {
        self.is_new = is_new;
        self
    }

    /// Publish time in epoch milliseconds, if known.
    pub fn published_ms(&self) -> Option<i64> {
        self.published_at.map(|t| t.timestamp_millis())
    }

    /// Headline and abstract joined by a space, lower-cased.
    pub fn text_lower(&self) -> String {
        format!("{} {}", self.headline, self.abstract_text).to_lowercase()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }
}

/// Content key for an article: SHA-256 over headline, abstract and publish
/// timestamp (sub-second digits kept when present) with all whitespace removed. Other fields do not participate, so
/// re-fetches of the same story under a different id share one cache entry.
pub fn fingerprint(article: &Article) -> String {
    let published = article
        .published_at
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(strip_whitespace(&article.headline).as_bytes());
    hasher.update(b"\n");
    hasher.update(strip_whitespace(&article.abstract_text).as_bytes());
    hasher.update(b"\n");
    hasher.update(published.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
