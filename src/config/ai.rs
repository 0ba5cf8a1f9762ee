// src/config/ai.rs
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}
fn default_endpoint() -> String {
    DEFAULT_OPENAI_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    /// "openai" | "lexicon" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: default_api_key(),
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn provider(&self) -> String {
        self.provider.trim().to_lowercase()
    }

    /// Literal key, or the env var when set to "ENV". Empty means not configured.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(&self.api_key, ENV_OPENAI_API_KEY)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Shared "ENV" indirection for API keys.
pub(crate) fn resolve_key(raw: &str, env_var: &str) -> Option<String> {
    let raw = raw.trim();
    let key = if raw.eq_ignore_ascii_case("env") {
        env::var(env_var).ok()?
    } else {
        raw.to_string()
    };
    let key = key.trim().to_string();
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_key_is_used_as_is() {
        let cfg = AiConfig {
            api_key: " sk-test ".into(),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn empty_key_is_not_configured() {
        let cfg = AiConfig {
            api_key: "  ".into(),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_api_key(), None);
    }

    #[serial_test::serial]
    #[test]
    fn env_indirection_reads_variable() {
        env::set_var(ENV_OPENAI_API_KEY, "sk-from-env");
        assert_eq!(
            AiConfig::default().resolve_api_key().as_deref(),
            Some("sk-from-env")
        );
        env::remove_var(ENV_OPENAI_API_KEY);
        assert_eq!(AiConfig::default().resolve_api_key(), None);
    }

    #[test]
    fn provider_is_case_insensitive() {
        let cfg = AiConfig {
            provider: " OpenAI ".into(),
            ..Default::default()
        };
        assert_eq!(cfg.provider(), "openai");
    }
}
