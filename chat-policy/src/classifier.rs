//! First-match intent classifier.

use thiserror::Error;
use tracing::debug;

use crate::intent::Intent;
use crate::rules::{pad, KeywordRule, DEFAULT_ETHICS_KEYWORDS, DEFAULT_OPINION_KEYWORDS};

/// Errors surfaced while building classification rules.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Rule configuration error.
    #[error("invalid classification rule: {0}")]
    InvalidRule(&'static str),
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Ordered keyword rules with a fallback intent.
///
/// Rules are evaluated in insertion order and the first rule with a keyword
/// hit decides the intent.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<KeywordRule>,
    fallback: Intent,
}

impl IntentClassifier {
    /// Creates a classifier with no rules.
    #[must_use]
    pub fn new(fallback: Intent) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Builds the standard chain: ethics triggers, then opinion triggers,
    /// then [`Intent::General`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidRule`] when a keyword is blank.
    pub fn standard<E, O, S, T>(ethics: E, opinion: O) -> PolicyResult<Self>
    where
        E: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Ok(Self::new(Intent::General)
            .with_rule(KeywordRule::new("ethics", Intent::Refusal, ethics)?)
            .with_rule(KeywordRule::new("opinion", Intent::Opinion, opinion)?))
    }

    /// Appends a rule after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: KeywordRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Classifies `input`.
    #[must_use]
    pub fn classify(&self, input: &str) -> Intent {
        let padded = pad(input);
        for rule in &self.rules {
            if let Some(keyword) = rule.first_hit(&padded) {
                debug!(
                    rule = rule.name(),
                    keyword,
                    intent = %rule.intent(),
                    "classification rule matched"
                );
                return rule.intent();
            }
        }
        self.fallback
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        // The built-in keyword lists are non-blank constants.
        Self::standard(DEFAULT_ETHICS_KEYWORDS, DEFAULT_OPINION_KEYWORDS)
            .unwrap_or_else(|_| Self::new(Intent::General))
    }
}
