use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AppError;

/// How keywords are matched against a store's product title.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Every keyword is a substring of the title.
    #[default]
    Keywords,
    /// Every keyword equals a whole alphanumeric token of the title.
    Tokens,
    /// The keywords appear contiguously, in order.
    Phrase,
}

impl FromStr for MatchPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keywords" | "substring" => Ok(MatchPolicy::Keywords),
            "tokens" | "exact" => Ok(MatchPolicy::Tokens),
            "phrase" => Ok(MatchPolicy::Phrase),
            other => Err(AppError::Validation(format!("Unknown match policy: {}", other))),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Keywords => write!(f, "keywords"),
            MatchPolicy::Tokens => write!(f, "tokens"),
            MatchPolicy::Phrase => write!(f, "phrase"),
        }
    }
}

/// The user's product query, parsed once per run.
///
/// Terms starting with `-` exclude titles containing them, e.g.
/// `"3080 evga -ti"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    keywords: Vec<String>,
    excluded: Vec<String>,
    policy: MatchPolicy,
}

impl SearchPattern {
    pub fn parse(text: &str, policy: MatchPolicy) -> Result<Self, AppError> {
        let mut keywords = Vec::new();
        let mut excluded = Vec::new();

        for term in text.to_lowercase().split_whitespace() {
            match term.strip_prefix('-') {
                Some("") => {}
                Some(rest) => excluded.push(rest.to_string()),
                None => keywords.push(term.to_string()),
            }
        }

        if keywords.is_empty() {
            return Err(AppError::Validation(format!(
                "Search pattern '{}' has no keywords",
                text.trim()
            )));
        }

        Ok(Self {
            keywords,
            excluded,
            policy,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Keywords joined for a store's search endpoint.
    pub fn query(&self, separator: &str) -> String {
        self.keywords.join(separator)
    }

    pub fn matches(&self, title: &str) -> bool {
        let text = title.to_lowercase();

        if self.excluded.iter().any(|term| text.contains(term.as_str())) {
            return false;
        }

        match self.policy {
            MatchPolicy::Keywords => self.keywords.iter().all(|k| text.contains(k.as_str())),
            MatchPolicy::Tokens => {
                let tokens = tokenize(&text);
                self.keywords
                    .iter()
                    .all(|k| tokens.iter().any(|t| t == k))
            }
            MatchPolicy::Phrase => {
                let haystack = tokenize(&text).join(" ");
                let needle = self
                    .keywords
                    .iter()
                    .flat_map(|k| tokenize(k))
                    .collect::<Vec<_>>()
                    .join(" ");
                !needle.is_empty() && format!(" {} ", haystack).contains(&format!(" {} ", needle))
            }
        }
    }
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keywords.join("+"))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
