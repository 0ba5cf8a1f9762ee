// src/analyze/mod.rs
//! Verdict production and the happy-filter rule applied to it.

pub mod ai_adapter;
pub mod rules;

pub use ai_adapter::{build_scorer, MockScorer, OpenAiScorer, SentimentScorer};
pub use rules::{HappyRules, Rejection};
