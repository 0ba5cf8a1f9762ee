// src/config/mod.rs
//! Application configuration (TOML).
//!
//! Lookup order:
//! 1) $HAPPY_NEWS_CONFIG
//! 2) config/happy_news.toml
//! 3) built-in defaults
//!
//! Every section and field is optional. API keys may be given literally or as
//! `"ENV"` to read `OPENAI_API_KEY` / `NYTIMES_API_KEY`.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::rules::HappyRules;
use crate::cache::{CacheSettings, DEFAULT_MAX_SIZE};
use crate::pipeline::{ClassifierSettings, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
use crate::session::SessionSettings;

pub use ai::AiConfig;

pub const ENV_CONFIG_PATH: &str = "HAPPY_NEWS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/happy_news.toml";
pub const ENV_NYTIMES_API_KEY: &str = "NYTIMES_API_KEY";
pub const DEFAULT_NYT_BASE_URL: &str = "https://api.nytimes.com/svc/news/v3/content";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub rules: HappyRules,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// "ENV" means: read from NYTIMES_API_KEY
    pub api_key: String,
    pub base_url: String,
    pub limit: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: "ENV".to_string(),
            base_url: DEFAULT_NYT_BASE_URL.to_string(),
            limit: 100,
        }
    }
}

impl SourceConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        ai::resolve_key(&self.api_key, ENV_NYTIMES_API_KEY)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub max_size: usize,
    pub retention_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache/happy_news"),
            max_size: DEFAULT_MAX_SIZE,
            retention_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: u64::try_from(DEFAULT_BATCH_DELAY.as_millis()).unwrap_or(1_000),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Section labels to keep; empty keeps everything.
    pub categories: Vec<String>,
}

impl AppConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        Ok(Self::default())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            max_size: self.cache.max_size.max(1),
            retention: Duration::from_secs(self.cache.retention_hours.saturating_mul(3600)),
        }
    }

    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            batch_size: self.pipeline.batch_size.max(1),
            batch_delay: Duration::from_millis(self.pipeline.batch_delay_ms),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            cache: self.cache_settings(),
            classifier: self.classifier_settings(),
            rules: self.effective_rules(),
        }
    }

    /// `[rules]` with provider-dependent defaults filled in: the lexicon scorer
    /// only understands English, so it requires English articles unless the
    /// file says otherwise.
    pub fn effective_rules(&self) -> HappyRules {
        let mut rules = self.rules.clone();
        if rules.require_english_language.is_none() {
            rules.require_english_language = Some(self.ai.provider() == "lexicon");
        }
        rules
    }
}
