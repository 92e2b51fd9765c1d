//! Keyword rules.

use crate::classifier::{PolicyError, PolicyResult};
use crate::intent::Intent;

/// Built-in ethics triggers.
pub const DEFAULT_ETHICS_KEYWORDS: &[&str] = &[
    "hack",
    "hacking",
    "steal",
    "stealing",
    "weapon",
    "weapons",
    "bomb",
    "kill",
    "malware",
    "ransomware",
    "phishing",
    "exploit",
    "fraud",
    "illegal",
];

/// Built-in prediction / opinion triggers.
pub const DEFAULT_OPINION_KEYWORDS: &[&str] = &[
    "predict",
    "prediction",
    "forecast",
    "opinion",
    "do you think",
    "what do you think",
    "your view",
    "who will",
    "will win",
    "should i",
    "in the future",
    "likely",
];

/// Routes an input to `intent` when any keyword occurs in it as whole words.
///
/// Keywords may be phrases; matching is case-insensitive and ignores
/// punctuation.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    name: String,
    intent: Intent,
    keywords: Vec<String>,
}

impl KeywordRule {
    /// Creates a rule.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidRule`] when the name is empty or a
    /// keyword normalises to nothing.
    pub fn new<I, S>(name: impl Into<String>, intent: Intent, keywords: I) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PolicyError::InvalidRule("rule name cannot be empty"));
        }

        let keywords = keywords
            .into_iter()
            .map(|keyword| normalize(keyword.as_ref()))
            .map(|keyword| {
                if keyword.is_empty() {
                    Err(PolicyError::InvalidRule("keywords cannot be blank"))
                } else {
                    Ok(keyword)
                }
            })
            .collect::<PolicyResult<Vec<_>>>()?;

        Ok(Self {
            name,
            intent,
            keywords,
        })
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the intent selected on a match.
    #[must_use]
    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// Returns the normalised keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the first keyword found in `padded`, the output of [`pad`].
    pub(crate) fn first_hit(&self, padded: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| padded.contains(&format!(" {keyword} ")))
            .map(String::as_str)
    }
}

/// Lowercases, turns every non-alphanumeric character into a space and
/// collapses runs of whitespace.
pub(crate) fn normalize(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalises and surrounds with single spaces so whole-word checks are a
/// plain substring search.
pub(crate) fn pad(text: &str) -> String {
    format!(" {} ", normalize(text))
}
