//! `OpenAI` embeddings client.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chat_memory::{EmbeddingProvider, EmbeddingVector, MemoryError, MemoryResult};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client, execute, normalize_base_url};
use crate::openai::OPENAI_BASE_URL;
use crate::traits::{AdapterError, AdapterResult};

/// Embedding model used when none is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Output dimension of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Configuration for [`OpenAiEmbedder`].
#[derive(Clone)]
pub struct OpenAiEmbeddingConfig {
    api_key: String,
    model: String,
    base_url: String,
    dimension: usize,
    timeout: Duration,
}

impl fmt::Debug for OpenAiEmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbeddingConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddingConfig {
    /// Creates a configuration for the default model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout: Duration::from_secs(30),
        }
    }

    /// Selects a model and the dimension it produces.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.model = model.into();
        self.dimension = dimension;
        self
    }

    /// Overrides the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = normalize_base_url(base_url.as_ref(), "OpenAI")?;
        Ok(self)
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Embedding provider backed by `/v1/embeddings`.
pub struct OpenAiEmbedder {
    client: HyperClient,
    endpoint: Uri,
    api_key: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for a blank key, a zero
    /// dimension, or an unparsable endpoint.
    pub fn new(config: OpenAiEmbeddingConfig) -> AdapterResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AdapterError::configuration(
                "OpenAI embeddings require an API key",
            ));
        }
        if config.dimension == 0 {
            return Err(AdapterError::configuration(
                "embedding dimension must be non-zero",
            ));
        }
        let endpoint = format!("{}v1/embeddings", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                AdapterError::configuration(format!("invalid OpenAI endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            api_key: config.api_key,
            model: config.model,
            dimension: config.dimension,
            timeout: config.timeout,
        })
    }

    async fn request_embedding(&self, text: &str) -> AdapterResult<Vec<f32>> {
        let body = serde_json::to_vec(&EmbeddingRequest {
            model: &self.model,
            input: text,
        })
        .map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode embedding request: {err}"))
        })?;

        let request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build embedding request: {err}"))
            })?;

        let bytes = execute(&self.client, request, self.timeout, "OpenAI embeddings").await?;
        let response: EmbeddingResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode embedding response: {err}"))
        })?;
        first_embedding(response)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> MemoryResult<EmbeddingVector> {
        if text.trim().is_empty() {
            return Err(MemoryError::embedding("cannot embed empty text"));
        }
        debug!(model = %self.model, chars = text.len(), "embedding text");
        let values = self.request_embedding(text).await?;
        let vector = EmbeddingVector::new(values)?;
        vector.ensure_dimension(self.dimension)?;
        Ok(vector)
    }
}

impl From<AdapterError> for MemoryError {
    fn from(err: AdapterError) -> Self {
        if err.is_transient() {
            MemoryError::unavailable(err.to_string())
        } else {
            MemoryError::embedding(err.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

fn first_embedding(response: EmbeddingResponse) -> AdapterResult<Vec<f32>> {
    response
        .data
        .into_iter()
        .min_by_key(|data| data.index)
        .map(|data| data.embedding)
        .ok_or_else(|| AdapterError::response("embedding response contained no data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected() {
        let err = OpenAiEmbedder::new(OpenAiEmbeddingConfig::new("")).unwrap_err();
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let config = OpenAiEmbeddingConfig::new("k").with_model("custom", 0);
        assert!(OpenAiEmbedder::new(config).is_err());
    }

    #[tokio::test]
    async fn empty_text_fails_before_any_request() {
        let embedder = OpenAiEmbedder::new(OpenAiEmbeddingConfig::new("k")).unwrap();
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, MemoryError::Embedding { .. }));
    }

    #[test]
    fn lowest_index_embedding_is_used() {
        let json = r#"{"data":[{"embedding":[0.3],"index":1},{"embedding":[0.1,0.2],"index":0}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_embedding(parsed).unwrap(), vec![0.1, 0.2]);
    }

    #[test]
    fn adapter_errors_map_by_transience() {
        let transient: MemoryError = AdapterError::transport("reset").into();
        assert!(transient.is_transient());
        let permanent: MemoryError = AdapterError::response("bad json").into();
        assert!(matches!(permanent, MemoryError::Embedding { .. }));
    }
}
