// src/analyze/ai_adapter.rs
//! AI sentiment service: scorer abstraction + OpenAI chat-completions provider.
//!
//! A scorer turns one article into a [`SentimentVerdict`]. Any per-call failure
//! (transport, status, unparseable reply) is reported as a [`ScoreError`]; the
//! orchestrator decides what to do with it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::article::{Article, SentimentVerdict};
use crate::config::ai::AiConfig;
use crate::error::ScoreError;
use crate::sentiment::LexiconScorer;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Score one article. Verdicts come back tagged `Fresh`.
    async fn score(&self, article: &Article) -> Result<SentimentVerdict, ScoreError>;

    /// Configuration check run once before a classification starts.
    fn check_ready(&self) -> Result<(), ScoreError> {
        Ok(())
    }

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynScorer = Arc<dyn SentimentScorer>;

/// Factory: build a scorer according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock scorer.
/// * Else picks by `provider`: `openai`, `lexicon` or `mock`.
///
/// A missing OpenAI key is not an error here; it surfaces from `check_ready`.
pub fn build_scorer(config: &AiConfig) -> Result<DynScorer, ScoreError> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockScorer::default()));
    }

    match config.provider().as_str() {
        "openai" => Ok(Arc::new(OpenAiScorer::new(config.resolve_api_key(), config)?)),
        "lexicon" => Ok(Arc::new(LexiconScorer::new())),
        "mock" => Ok(Arc::new(MockScorer::default())),
        other => Err(ScoreError::UnknownProvider(other.to_string())),
    }
}

// ------------------------------------------------------------
// OpenAI provider
// ------------------------------------------------------------

const SYSTEM_PROMPT: &str = "You are a sentiment analysis expert. Analyze news articles and determine if they are uplifting, positive news that would make people happy.";

/// OpenAI provider (Chat Completions API).
pub struct OpenAiScorer {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenAiScorer {
    pub fn new(api_key: Option<String>, config: &AiConfig) -> Result<Self, ScoreError> {
        let http = reqwest::Client::builder()
            .user_agent("happy-news/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

fn user_prompt(article: &Article) -> String {
    format!(
        "Analyze the sentiment and content of this news article. Respond with a JSON object containing:\n\
         - sentiment: number from 1-10 (1=very negative, 5=neutral, 10=very positive)\n\
         - isUplifting: boolean (true if the article is uplifting/positive/happy news)\n\
         - reasoning: brief explanation of the sentiment\n\n\
         Article:\n\
         Title: {}\n\
         Abstract: {}\n\n\
         Respond only with valid JSON:",
        article.headline, article.abstract_text
    )
}

#[async_trait]
impl SentimentScorer for OpenAiScorer {
    async fn score(&self, article: &Article) -> Result<SentimentVerdict, ScoreError> {
        let api_key = self.api_key.as_deref().ok_or(ScoreError::MissingApiKey)?;

        let prompt = user_prompt(article);
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.1,
            max_tokens: 200,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ScoreError::Status(resp.status().as_u16()));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ScoreError::Parse(format!("chat response: {e}")))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ScoreError::Parse("no choices in reply".into()))?;

        parse_verdict_reply(content)
    }

    fn check_ready(&self) -> Result<(), ScoreError> {
        match self.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(()),
            _ => Err(ScoreError::MissingApiKey),
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock provider
// ------------------------------------------------------------

/// Returns the same verdict for every article.
#[derive(Debug, Clone)]
pub struct MockScorer {
    pub fixed: SentimentVerdict,
}

impl Default for MockScorer {
    fn default() -> Self {
        Self {
            fixed: SentimentVerdict::fresh(8, true, "Uplifting (mock)"),
        }
    }
}

#[async_trait]
impl SentimentScorer for MockScorer {
    async fn score(&self, _article: &Article) -> Result<SentimentVerdict, ScoreError> {
        Ok(self.fixed.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Reply parsing
// ------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerdictReply {
    sentiment: f64,
    is_uplifting: bool,
    #[serde(default)]
    reasoning: String,
}

/// Parse the model's JSON verdict. Tolerates surrounding prose or a fenced
/// block by taking the outermost `{...}`.
pub fn parse_verdict_reply(content: &str) -> Result<SentimentVerdict, ScoreError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &content[s..=e],
        _ => return Err(ScoreError::Parse("no JSON object in reply".into())),
    };

    let reply: VerdictReply =
        serde_json::from_str(json).map_err(|e| ScoreError::Parse(e.to_string()))?;
    if !reply.sentiment.is_finite() {
        return Err(ScoreError::Parse("sentiment is not a number".into()));
    }

    let score = reply.sentiment.round().clamp(1.0, 10.0) as u8;
    Ok(SentimentVerdict::fresh(
        score,
        reply.is_uplifting,
        sanitize_reason(&reply.reasoning),
    ))
}

/// Single line, <=160 chars, whitespace collapsed.
pub fn sanitize_reason(input: &str) -> String {
    let mut out = String::with_capacity(160);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() {
            ' '
        } else {
            ch
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.chars().count() >= 160 {
            break;
        }
    }
    out.trim().to_string()
}
