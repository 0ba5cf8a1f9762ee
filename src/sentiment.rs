// src/sentiment.rs
//! Offline word-list scorer. Needs no API key; useful when the AI service is
//! not configured and as a deterministic stand-in during development.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::analyze::ai_adapter::SentimentScorer;
use crate::article::{Article, SentimentVerdict};
use crate::error::ScoreError;

/// AFINN-style weights in [-5, 5].
const WORDS: &[(&str, i32)] = &[
    // positive
    ("amazing", 4),
    ("award", 3),
    ("beautiful", 3),
    ("best", 3),
    ("breakthrough", 3),
    ("celebrate", 3),
    ("celebrates", 3),
    ("cheer", 2),
    ("cure", 3),
    ("delight", 3),
    ("donate", 2),
    ("donates", 2),
    ("freedom", 2),
    ("friendly", 2),
    ("generous", 2),
    ("glad", 3),
    ("good", 3),
    ("great", 3),
    ("happy", 3),
    ("heal", 2),
    ("help", 2),
    ("helps", 2),
    ("hero", 2),
    ("hope", 2),
    ("inspiring", 3),
    ("joy", 3),
    ("kind", 2),
    ("love", 3),
    ("restored", 2),
    ("rescue", 2),
    ("rescued", 2),
    ("reunite", 2),
    ("reunited", 2),
    ("success", 2),
    ("thrive", 2),
    ("thriving", 2),
    ("triumph", 4),
    ("win", 4),
    ("wins", 4),
    ("wonderful", 4),
    // negative
    ("afraid", -2),
    ("angry", -3),
    ("bad", -3),
    ("ban", -2),
    ("collapse", -2),
    ("dead", -3),
    ("decline", -1),
    ("fail", -2),
    ("fails", -2),
    ("fear", -2),
    ("fight", -1),
    ("hate", -3),
    ("hurt", -2),
    ("injured", -2),
    ("loss", -3),
    ("lost", -3),
    ("poor", -2),
    ("sad", -2),
    ("shortage", -2),
    ("sick", -2),
    ("terrible", -3),
    ("threat", -2),
    ("worst", -3),
    ("wrong", -2),
];

static LEXICON: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| WORDS.iter().copied().collect());

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    /// Returns (score, token count).
    /// Negation: if a negator appears within the previous 1..=3 tokens, the
    /// word's sign flips.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for (i, tok) in tokens.iter().enumerate() {
            let base = *LEXICON.get(tok.as_str()).unwrap_or(&0);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }

    /// Map a raw lexicon sum onto the 1..=10 verdict scale.
    pub fn verdict_for(&self, article: &Article) -> SentimentVerdict {
        let (sum, tokens) = self.score_text(&format!(
            "{} {}",
            article.headline, article.abstract_text
        ));
        let scaled = (5 + sum).clamp(1, 10);
        SentimentVerdict::fresh(
            u8::try_from(scaled).unwrap_or(5),
            sum > 0,
            format!("lexicon score {sum} over {tokens} tokens"),
        )
    }
}

#[async_trait]
impl SentimentScorer for LexiconScorer {
    async fn score(&self, article: &Article) -> Result<SentimentVerdict, ScoreError> {
        Ok(self.verdict_for(article))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Alphanumeric tokens (apostrophes kept), lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "won't" | "can't" | "cannot"
            | "without"
    )
}
