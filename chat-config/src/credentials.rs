//! Credentials and endpoints read from the process environment.

use std::{env, fmt};

use chat_memory::SimilarityMetric;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Completion and embedding API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Optional OpenAI-compatible base URL.
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
/// Optional chat model override.
pub const CHAT_MODEL_ENV: &str = "CHAT_MODEL";
/// Optional embedding model override.
pub const EMBEDDING_MODEL_ENV: &str = "EMBEDDING_MODEL";
/// Optional embedding dimension, required to change alongside the model.
pub const EMBEDDING_DIMENSION_ENV: &str = "EMBEDDING_DIMENSION";
/// Vector store API key.
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
/// Vector index name.
pub const PINECONE_INDEX_ENV: &str = "PINECONE_INDEX";
/// Vector store environment / region.
pub const PINECONE_ENVIRONMENT_ENV: &str = "PINECONE_ENVIRONMENT";
/// Optional data-plane host, skips the controller lookup.
pub const PINECONE_INDEX_HOST_ENV: &str = "PINECONE_INDEX_HOST";
/// Optional index metric, checked against the controller when the host is
/// looked up and trusted as-is when the host is configured.
pub const PINECONE_METRIC_ENV: &str = "PINECONE_METRIC";

/// Where conversation memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryMode {
    /// Hosted vector index; requires vector-store credentials.
    #[default]
    Hosted,
    /// In-process index that lives as long as the process.
    Local,
}

/// Hosted vector index credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct PineconeCredentials {
    /// API key.
    pub api_key: String,
    /// Index name.
    pub index: String,
    /// Environment / region.
    pub environment: String,
    /// Data-plane host, when known up front.
    pub host: Option<String>,
    /// Metric the index was created with, when known up front.
    pub metric: Option<SimilarityMetric>,
}

impl fmt::Debug for PineconeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeCredentials")
            .field("index", &self.index)
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

/// Resolved memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryBackend {
    /// Hosted index.
    Hosted(PineconeCredentials),
    /// In-process index.
    Local,
}

/// Process-wide settings, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Completion and embedding API key.
    pub openai_api_key: String,
    /// Base URL override for the completion and embedding provider.
    pub openai_base_url: Option<String>,
    /// Chat model override.
    pub chat_model: Option<String>,
    /// Embedding model override and its dimension.
    pub embedding_model: Option<(String, usize)>,
    /// Memory backend.
    pub memory: MemoryBackend,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("openai_base_url", &self.openai_base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

impl ChatConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required variable is absent and
    /// [`ConfigError::Invalid`] when an optional one cannot be parsed.
    pub fn from_env(mode: MemoryMode) -> ConfigResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => {
                return Err(ConfigError::Invalid {
                    var: ".env",
                    reason: err.to_string(),
                });
            }
        }
        Self::from_lookup(mode, |var| env::var(var).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// See [`ChatConfig::from_env`].
    pub fn from_lookup<F>(mode: MemoryMode, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |var: &'static str| {
            lookup(var)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required =
            |var: &'static str| optional(var).ok_or(ConfigError::Missing { var });

        let openai_api_key = required(OPENAI_API_KEY_ENV)?;

        let embedding_model = match (
            optional(EMBEDDING_MODEL_ENV),
            optional(EMBEDDING_DIMENSION_ENV),
        ) {
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    var: EMBEDDING_DIMENSION_ENV,
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    var: EMBEDDING_MODEL_ENV,
                });
            }
            (Some(model), Some(dimension)) => Some((model, parse_dimension(&dimension)?)),
        };

        let memory = match mode {
            MemoryMode::Local => MemoryBackend::Local,
            MemoryMode::Hosted => MemoryBackend::Hosted(PineconeCredentials {
                api_key: required(PINECONE_API_KEY_ENV)?,
                index: required(PINECONE_INDEX_ENV)?,
                environment: required(PINECONE_ENVIRONMENT_ENV)?,
                host: optional(PINECONE_INDEX_HOST_ENV),
                metric: optional(PINECONE_METRIC_ENV)
                    .map(|name| parse_metric(&name))
                    .transpose()?,
            }),
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: optional(OPENAI_BASE_URL_ENV),
            chat_model: optional(CHAT_MODEL_ENV),
            embedding_model,
            memory,
        })
    }
}

fn parse_dimension(value: &str) -> ConfigResult<usize> {
    match value.parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            var: EMBEDDING_DIMENSION_ENV,
            reason: "must be non-zero".to_owned(),
        }),
        Ok(dimension) => Ok(dimension),
        Err(err) => Err(ConfigError::Invalid {
            var: EMBEDDING_DIMENSION_ENV,
            reason: err.to_string(),
        }),
    }
}

fn parse_metric(name: &str) -> ConfigResult<SimilarityMetric> {
    name.parse::<SimilarityMetric>().map_err(|err| ConfigError::Invalid {
        var: PINECONE_METRIC_ENV,
        reason: err.to_string(),
    })
}
