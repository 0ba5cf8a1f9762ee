// src/analyze/rules.rs
//! Happy-filter rule.
//!
//! An article passes iff ALL of:
//! - the verdict says uplifting,
//! - the verdict score is >= `min_score` (default 6),
//! - neither headline nor abstract contains a negative keyword (case-insensitive),
//! - the section label does not contain a non-English section marker,
//! - the combined text does not contain a non-English indicator phrase,
//! - (optional) the article language is English. Unset means off, except
//!   that the config layer turns it on for the offline lexicon scorer.
//!
//! The rule is a pure function of the article text and the verdict. Lists can
//! be overridden from the `[rules]` config section.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::article::{Article, SentimentVerdict};
use crate::ingest::is_english;

pub const DEFAULT_MIN_SCORE: u8 = 6;

const NEGATIVE_KEYWORDS: &[&str] = &[
    "death", "killed", "murder", "war", "attack", "violence", "crime", "fraud", "scandal",
    "crisis", "disaster", "tragedy", "fire", "accident", "crash", "storm", "flood",
    "earthquake", "trump",
];

const NON_ENGLISH_SECTIONS: &[&str] = &["en español", "en espanol", "spanish", "espanol"];

const NON_ENGLISH_PHRASES: &[&str] = &["en español", "en espanol"];

/// Why an article was kept out of the happy set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotUplifting,
    LowScore(u8),
    NegativeKeyword(String),
    NonEnglishSection(String),
    NonEnglishText(String),
    NonEnglishLanguage(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HappyRules {
    pub min_score: u8,
    pub negative_keywords: Vec<String>,
    pub non_english_sections: Vec<String>,
    pub non_english_phrases: Vec<String>,
    /// `None` means not configured; treated as off.
    pub require_english_language: Option<bool>,
}

impl Default for HappyRules {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            negative_keywords: to_owned(NEGATIVE_KEYWORDS),
            non_english_sections: to_owned(NON_ENGLISH_SECTIONS),
            non_english_phrases: to_owned(NON_ENGLISH_PHRASES),
            require_english_language: None,
        }
    }
}

impl HappyRules {
    pub fn requires_english(&self) -> bool {
        self.require_english_language.unwrap_or(false)
    }

    pub fn passes(&self, article: &Article, verdict: &SentimentVerdict) -> bool {
        self.evaluate(article, verdict).is_ok()
    }

    /// Same predicate as [`passes`](Self::passes), reporting the first failing check.
    pub fn evaluate(&self, article: &Article, verdict: &SentimentVerdict) -> Result<(), Rejection> {
        if !verdict.is_uplifting {
            return Err(Rejection::NotUplifting);
        }
        if verdict.score < self.min_score {
            return Err(Rejection::LowScore(verdict.score));
        }

        let headline = normalize(&article.headline);
        let abstract_text = normalize(&article.abstract_text);
        if let Some(k) = self
            .negative_keywords
            .iter()
            .find(|k| contains(&headline, k) || contains(&abstract_text, k))
        {
            return Err(Rejection::NegativeKeyword(k.clone()));
        }

        if let Some(section) = article.section.as_deref() {
            let section = normalize(section);
            if let Some(m) = self
                .non_english_sections
                .iter()
                .find(|m| contains(&section, m))
            {
                return Err(Rejection::NonEnglishSection(m.clone()));
            }
        }

        let combined = format!("{headline} {abstract_text}");
        if let Some(p) = self
            .non_english_phrases
            .iter()
            .find(|p| contains(&combined, p))
        {
            return Err(Rejection::NonEnglishText(p.clone()));
        }

        if self.requires_english() && !is_english(article) {
            return Err(Rejection::NonEnglishLanguage(article.language.clone()));
        }

        Ok(())
    }
}

// --- internals ---

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `text` is already normalized; the pattern is normalized here.
fn contains(text: &str, pat: &str) -> bool {
    let p = normalize(pat);
    !p.is_empty() && text.contains(p.as_str())
}

/// Lowercase + condensed whitespace.
fn normalize(input: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re_ws
        .replace_all(input.trim(), " ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(headline: &str, abstract_text: &str) -> Article {
        Article::new("id", headline, abstract_text, None)
    }

    fn good() -> SentimentVerdict {
        SentimentVerdict::fresh(8, true, "warm")
    }

    #[test]
    fn uplifting_high_score_clean_text_passes() {
        let r = HappyRules::default();
        assert!(r.passes(&art("Community garden blooms", "Neighbors share harvest"), &good()));
    }

    #[test]
    fn score_threshold_is_inclusive() {
        let r = HappyRules::default();
        let a = art("Library reopens", "Kids cheer");
        assert!(r.passes(&a, &SentimentVerdict::fresh(6, true, "")));
        assert_eq!(
            r.evaluate(&a, &SentimentVerdict::fresh(5, true, "")),
            Err(Rejection::LowScore(5))
        );
    }

    #[test]
    fn not_uplifting_fails_even_with_high_score() {
        let r = HappyRules::default();
        let v = SentimentVerdict::fresh(9, false, "");
        assert_eq!(
            r.evaluate(&art("Sunny day", "Nice"), &v),
            Err(Rejection::NotUplifting)
        );
    }

    #[test]
    fn negative_keywords_are_case_insensitive() {
        let r = HappyRules::default();
        assert_eq!(
            r.evaluate(&art("Town rebuilds after FLOOD", "hope"), &good()),
            Err(Rejection::NegativeKeyword("flood".into()))
        );
        assert!(!r.passes(&art("Hope returns", "After the Trump rally"), &good()));
    }

    #[test]
    fn substring_match_like_plain_contains() {
        // "war" matches inside "award": the check is a substring test.
        let r = HappyRules::default();
        assert!(!r.passes(&art("Teacher wins award", "Students celebrate"), &good()));
    }

    #[test]
    fn spanish_section_and_phrases_fail() {
        let r = HappyRules::default();
        let a = art("Buenas noticias", "Un día feliz").with_section("En Español");
        assert_eq!(
            r.evaluate(&a, &good()),
            Err(Rejection::NonEnglishSection("en español".into()))
        );

        let b = art("Read this EN ESPAÑOL", "Happy");
        assert_eq!(
            r.evaluate(&b, &good()),
            Err(Rejection::NonEnglishText("en español".into()))
        );
    }

    #[test]
    fn language_check_is_opt_in() {
        let mut a = art("Puppies", "Cute");
        a.language = "es".into();
        assert!(HappyRules::default().passes(&a, &good()));

        let strict = HappyRules {
            require_english_language: Some(true),
            ..Default::default()
        };
        assert_eq!(
            strict.evaluate(&a, &good()),
            Err(Rejection::NonEnglishLanguage("es".into()))
        );
    }

    #[test]
    fn rule_is_deterministic() {
        let r = HappyRules::default();
        let a = art("Bakery gives away bread", "Town smiles");
        let first = r.passes(&a, &good());
        for _ in 0..10 {
            assert_eq!(r.passes(&a, &good()), first);
        }
    }

    #[test]
    fn config_overrides_merge_with_defaults() {
        let r: HappyRules = toml::from_str("min_score = 8\nnegative_keywords = [\"rain\"]").unwrap();
        assert_eq!(r.min_score, 8);
        assert_eq!(r.negative_keywords, vec!["rain".to_string()]);
        assert_eq!(r.non_english_sections, HappyRules::default().non_english_sections);
    }
}
