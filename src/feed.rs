// src/feed.rs
//! Category listing and filtering over a classified feed.

use std::collections::BTreeMap;

use crate::article::Article;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Distinct non-empty section labels, sorted by name, with article counts.
pub fn categories(articles: &[Article]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for section in articles
        .iter()
        .filter_map(|a| a.section.as_deref())
        .filter(|s| !s.trim().is_empty())
    {
        *counts.entry(section).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| CategoryCount {
            name: name.to_string(),
            count,
        })
        .collect()
}

/// Keep articles whose section is in `selected`. An empty selection keeps all.
pub fn filter_by_categories<S: AsRef<str>>(articles: Vec<Article>, selected: &[S]) -> Vec<Article> {
    if selected.is_empty() {
        return articles;
    }
    articles
        .into_iter()
        .filter(|a| {
            a.section
                .as_deref()
                .is_some_and(|s| selected.iter().any(|c| c.as_ref() == s))
        })
        .collect()
}
