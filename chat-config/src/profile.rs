//! Pipeline profile: everything about a turn that is data rather than code.
//!
//! A profile is TOML. Every field has a default, so an empty file (or no
//! file at all) yields the stock pipeline:
//!
//! ```toml
//! metric = "cosine"
//! recall_threshold = 0.95
//! history_window = 6
//!
//! [prompts]
//! assistant_name = "Ada"
//!
//! [retry]
//! max_attempts = 4
//! call_timeout_ms = 15000
//! ```

use std::path::Path;
use std::time::Duration;

use chat_memory::SimilarityMetric;
use chat_policy::{
    DEFAULT_ETHICS_KEYWORDS, DEFAULT_OPINION_KEYWORDS, IntentClassifier, ReplyFilter,
};
use chat_prompts::{HistoryWindow, PromptBook};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, ConfigResult};

/// Marker placed before replies served from memory.
pub const DEFAULT_RECALL_PREFIX: &str = "(from memory) ";

/// Marker placed before refusal replies.
pub const DEFAULT_REFUSAL_PREFIX: &str = "[declined] ";

/// Retry budget shared by every external call in a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub initial_delay_ms: u64,
    /// Backoff ceiling.
    pub max_delay_ms: u64,
    /// Growth factor between attempts.
    pub backoff_multiplier: f64,
    /// Deadline for a single attempt.
    pub call_timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            backoff_multiplier: 2.0,
            call_timeout_ms: 30_000,
        }
    }
}

impl RetrySettings {
    /// Backoff before the second attempt.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Backoff ceiling.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Deadline for a single attempt.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::profile("retry.max_attempts must be at least 1"));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::profile("retry.call_timeout_ms must be non-zero"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::profile("retry.backoff_multiplier must be >= 1.0"));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::profile(
                "retry.max_delay_ms must not be below retry.initial_delay_ms",
            ));
        }
        Ok(())
    }
}

/// Tunable pipeline data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineProfile {
    /// Per-intent system instructions.
    pub prompts: PromptBook,
    /// Keywords routing a turn to the refusal instruction.
    pub ethics_keywords: Vec<String>,
    /// Keywords routing a turn to the opinion instruction.
    pub opinion_keywords: Vec<String>,
    /// Similarity metric of the in-process index.
    pub metric: SimilarityMetric,
    /// Minimum similarity for a memory hit.
    pub recall_threshold: f32,
    /// Prepended to replies served from memory.
    pub recall_prefix: String,
    /// Prepended to refusal replies.
    pub refusal_prefix: String,
    /// Minimum whitespace-delimited tokens for a reply to be stored.
    pub min_reply_tokens: usize,
    /// Number of earlier messages forwarded with each completion.
    pub history_window: HistoryWindow,
    /// Sampling temperature; provider default when unset.
    pub temperature: Option<f32>,
    /// Output token cap; provider default when unset.
    pub max_output_tokens: Option<u32>,
    /// Retry budget.
    pub retry: RetrySettings,
}

impl Default for PipelineProfile {
    fn default() -> Self {
        Self {
            prompts: PromptBook::default(),
            ethics_keywords: DEFAULT_ETHICS_KEYWORDS.iter().map(|&k| k.to_owned()).collect(),
            opinion_keywords: DEFAULT_OPINION_KEYWORDS.iter().map(|&k| k.to_owned()).collect(),
            metric: SimilarityMetric::default(),
            recall_threshold: 0.95,
            recall_prefix: DEFAULT_RECALL_PREFIX.to_owned(),
            refusal_prefix: DEFAULT_REFUSAL_PREFIX.to_owned(),
            min_reply_tokens: 2,
            history_window: HistoryWindow::default(),
            temperature: None,
            max_output_tokens: None,
            retry: RetrySettings::default(),
        }
    }
}

impl PipelineProfile {
    /// Parses and validates a TOML profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Profile`] for inconsistent values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let profile: Self = toml::from_str(source)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads and validates a TOML profile file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`PipelineProfile::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_toml_str(&source)?;
        info!(
            path = %path.display(),
            metric = %profile.metric,
            threshold = profile.recall_threshold,
            "loaded pipeline profile"
        );
        Ok(profile)
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Profile`] describing the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.recall_threshold.is_finite() {
            return Err(ConfigError::profile("recall_threshold must be finite"));
        }
        if matches!(self.metric, SimilarityMetric::Cosine) && self.recall_threshold > 1.0 {
            return Err(ConfigError::profile(
                "recall_threshold above 1.0 can never match under cosine similarity",
            ));
        }
        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ConfigError::profile("temperature must be within 0.0..=2.0"));
        }
        self.prompts
            .validate()
            .map_err(|err| ConfigError::profile(err.to_string()))?;
        self.classifier()?;
        self.retry.validate()
    }

    /// Builds the intent classifier from the keyword sets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Profile`] when a keyword is blank.
    pub fn classifier(&self) -> ConfigResult<IntentClassifier> {
        IntentClassifier::standard(&self.ethics_keywords, &self.opinion_keywords)
            .map_err(|err| ConfigError::profile(err.to_string()))
    }

    /// Memory admission filter.
    #[must_use]
    pub fn reply_filter(&self) -> ReplyFilter {
        ReplyFilter::new(self.min_reply_tokens)
    }
}
