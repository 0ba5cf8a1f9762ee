// src/ingest/mod.rs
//! Article source adapters: fetch raw articles and normalize them into
//! [`Article`]s for the classification pipeline.

pub mod nytimes;

use async_trait::async_trait;

use crate::article::Article;
use crate::error::SourceError;

pub use nytimes::{NytClient, NytSource};

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch the latest articles, already normalized.
    async fn fetch_articles(&self) -> Result<Vec<Article>, SourceError>;
    fn name(&self) -> &'static str;
}

/// Empty, `en` and `eng` language codes count as English.
pub fn is_english(article: &Article) -> bool {
    let lang = article.language.trim();
    lang.is_empty() || lang.eq_ignore_ascii_case("en") || lang.eq_ignore_ascii_case("eng")
}

/// Fixed list of articles; handy for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub articles: Vec<Article>,
}

#[async_trait]
impl ArticleSource for StaticSource {
    async fn fetch_articles(&self) -> Result<Vec<Article>, SourceError> {
        Ok(self.articles.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
