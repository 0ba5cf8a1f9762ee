// src/ingest/nytimes.rs
//! NYT Times Newswire client (`/all/all.json`) and field mapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::article::Article;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::ingest::ArticleSource;

const LARGE_SUBTYPES: &[&str] = &["xlarge", "superJumbo", "jumbo"];
const MEDIUM_SUBTYPES: &[&str] = &["mediumThreeByTwo440", "mediumThreeByTwo210"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Multimedia {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

/// Newswire item as returned by the API. Everything is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub byline: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub multimedia: Option<Vec<Multimedia>>,
}

#[derive(Deserialize)]
struct NewswireResponse {
    #[serde(default)]
    results: Option<Vec<RawArticle>>,
}

pub struct NytClient {
    http: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl NytClient {
    pub fn new(base_url: impl Into<String>, limit: u32) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent("happy-news/0.1")
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limit,
        })
    }

    pub fn from_config(cfg: &SourceConfig) -> Result<Self, SourceError> {
        Self::new(cfg.base_url.clone(), cfg.limit)
    }

    /// GET `{base}/all/all.json`. A body without `results` is an empty list.
    pub async fn fetch(&self, api_key: Option<&str>) -> Result<Vec<RawArticle>, SourceError> {
        let key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SourceError::MissingApiKey)?;

        let url = format!("{}/all/all.json", self.base_url);
        let limit = self.limit.to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[("api-key", key), ("limit", limit.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: NewswireResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        let results = body.results.unwrap_or_default();
        debug!(count = results.len(), "fetched newswire articles");
        Ok(results)
    }
}

/// Pure mapping from the wire shape to [`Article`].
pub fn normalize(raw: RawArticle) -> Article {
    let thumbnail = raw.multimedia.as_deref().and_then(best_thumbnail);
    let published_at = raw
        .published_date
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|t| t.with_timezone(&Utc));
    let language = raw
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "en".to_string());

    let mut article = Article::new(
        raw.uri.unwrap_or_default(),
        raw.title.unwrap_or_default(),
        raw.abstract_text.unwrap_or_default(),
        published_at,
    );
    article.url = raw.url;
    article.byline = raw.byline;
    article.section = raw.section.filter(|s| !s.trim().is_empty());
    article.language = language;
    article.thumbnail = thumbnail;
    article
}

/// Large subtypes, then medium, then whatever comes first.
fn best_thumbnail(media: &[Multimedia]) -> Option<String> {
    let by_subtype = |wanted: &[&str]| {
        media
            .iter()
            .find(|m| m.subtype.as_deref().is_some_and(|s| wanted.contains(&s)))
            .and_then(|m| m.url.clone())
    };
    by_subtype(LARGE_SUBTYPES)
        .or_else(|| by_subtype(MEDIUM_SUBTYPES))
        .or_else(|| media.first().and_then(|m| m.url.clone()))
}

/// [`ArticleSource`] over the newswire with a resolved key.
pub struct NytSource {
    client: NytClient,
    api_key: Option<String>,
}

impl NytSource {
    pub fn new(client: NytClient, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    pub fn from_config(cfg: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self::new(NytClient::from_config(cfg)?, cfg.resolve_api_key()))
    }
}

#[async_trait]
impl ArticleSource for NytSource {
    async fn fetch_articles(&self) -> Result<Vec<Article>, SourceError> {
        let raw = self.client.fetch(self.api_key.as_deref()).await?;
        Ok(raw.into_iter().map(normalize).collect())
    }

    fn name(&self) -> &'static str {
        "nytimes"
    }
}
