//! Shared adapter traits and data structures.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chat_primitives::ChatMessage;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Chunks of one completion, as produced by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Failures talking to a provider.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Bad or missing credentials, endpoints, or dimensions.
    #[error("provider misconfigured: {reason}")]
    Configuration {
        /// What is wrong.
        reason: String,
    },

    /// The supplied request was invalid for the target provider.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was refused before sending.
        reason: String,
    },

    /// Transport-level failures (connect, TLS, timeout).
    #[error("provider unreachable: {reason}")]
    Transport {
        /// Underlying I/O or TLS message.
        reason: String,
    },

    /// HTTP 429.
    #[error("provider rate limited the call (retry after {retry_after:?})")]
    RateLimited {
        /// Delay from the `Retry-After` header, if sent.
        retry_after: Option<Duration>,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} returned {status}: {reason}")]
    Status {
        /// Provider label.
        provider: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        reason: String,
    },

    /// The body could not be decoded or lacked the expected content.
    #[error("unexpected provider response: {reason}")]
    Response {
        /// Decoder message.
        reason: String,
    },
}

impl AdapterError {
    /// [`AdapterError::InvalidRequest`] with `reason`.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// [`AdapterError::Configuration`] with `reason`.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// [`AdapterError::Transport`] with `reason`.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// [`AdapterError::Response`] with `reason`.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }

    /// Returns true when repeating the call may succeed: transport failures,
    /// rate limiting, and 5xx statuses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::RateLimited { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-suggested backoff, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Minimal metadata describing an adapter instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: &'static str,
    model: String,
}

impl AdapterMetadata {
    /// Labels an adapter.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Provider label, such as `openai`.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// One completion call: the assembled messages plus sampling knobs.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InferenceRequest {
    messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl InferenceRequest {
    /// Wraps assembled messages.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] when `messages` is empty.
    pub fn new(messages: Vec<ChatMessage>) -> AdapterResult<Self> {
        if messages.is_empty() {
            return Err(AdapterError::invalid_request(
                "completion request has no messages",
            ));
        }

        Ok(Self {
            messages,
            max_output_tokens: None,
            temperature: None,
        })
    }

    /// Caps the reply length.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Overrides the provider's default temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Messages in send order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Reply length cap, if set.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Temperature, if set.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// A piece of a reply.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct InferenceChunk {
    /// Text to append.
    pub delta: String,
    /// Set on the last chunk.
    pub done: bool,
}

impl InferenceChunk {
    /// Creates a new chunk.
    #[must_use]
    pub fn new(delta: impl Into<String>, done: bool) -> Self {
        Self {
            delta: delta.into(),
            done,
        }
    }
}

/// Completion provider.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Provider and model labels.
    fn metadata(&self) -> &AdapterMetadata;

    /// Sends `request` and returns the reply as a stream of chunks.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;

    /// Runs [`ModelAdapter::infer`] and concatenates the stream into the
    /// trimmed reply text.
    ///
    /// # Errors
    ///
    /// Propagates the first error from the call or the stream.
    async fn complete(&self, request: InferenceRequest) -> AdapterResult<String> {
        let mut stream = self.infer(request).await?;
        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            reply.push_str(&chunk.delta);
            if chunk.done {
                break;
            }
        }
        Ok(reply.trim().to_owned())
    }
}

/// A single-call collaborator such as web search or a device bridge.
///
/// Takes optional text and returns text.
#[async_trait]
pub trait AuxiliaryCapability: Send + Sync {
    /// Command name the capability is invoked by (`/name`).
    fn name(&self) -> &str;

    /// One-line description shown in help output.
    fn description(&self) -> &str;

    /// Invokes the capability.
    async fn invoke(&self, input: Option<&str>) -> AdapterResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn validates_request_messages() {
        let err = InferenceRequest::new(Vec::new()).expect_err("messages required");
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn transient_classification() {
        assert!(AdapterError::transport("reset").is_transient());
        assert!(AdapterError::RateLimited { retry_after: None }.is_transient());
        let server = AdapterError::Status {
            provider: "openai",
            status: 503,
            reason: "unavailable".into(),
        };
        assert!(server.is_transient());
        let client = AdapterError::Status {
            provider: "openai",
            status: 401,
            reason: "bad key".into(),
        };
        assert!(!client.is_transient());
        assert!(!AdapterError::response("garbage").is_transient());
    }

    struct Chunked(Vec<&'static str>);

    #[async_trait]
    impl ModelAdapter for Chunked {
        fn metadata(&self) -> &AdapterMetadata {
            unimplemented!("not needed in this test")
        }

        async fn infer(&self, _request: InferenceRequest) -> AdapterResult<AdapterStream> {
            let last = self.0.len() - 1;
            let chunks: Vec<_> = self
                .0
                .iter()
                .enumerate()
                .map(|(i, delta)| Ok(InferenceChunk::new(*delta, i == last)))
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    #[tokio::test]
    async fn complete_concatenates_and_trims() {
        let adapter = Chunked(vec!["  Hello", ", ", "world  "]);
        let request = InferenceRequest::new(vec![ChatMessage::user("hi")]).unwrap();
        assert_eq!(adapter.complete(request).await.unwrap(), "Hello, world");
    }
}
