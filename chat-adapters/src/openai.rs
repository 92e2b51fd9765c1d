//! `OpenAI` chat completions adapter.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chat_primitives::ChatMessage;
use futures::stream;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client, execute, normalize_base_url};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter,
};

/// Public API root, shared with the embeddings client.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/";

/// Model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Settings for [`OpenAiAdapter`].
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Chat completions against the public API with `model`.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Points the adapter at an OpenAI-compatible server.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = normalize_base_url(base_url.as_ref(), "OpenAI")?;
        Ok(self)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Completion provider backed by `/v1/chat/completions`.
///
/// Replies arrive whole; [`ModelAdapter::infer`] yields a single final chunk.
pub struct OpenAiAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Builds the client. No request is made until the first turn.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for a blank key or model, or an
    /// unusable endpoint.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AdapterError::configuration(
                "chat completions require an API key",
            ));
        }
        if config.model.trim().is_empty() {
            return Err(AdapterError::configuration("chat model must not be blank"));
        }
        let endpoint = format!("{}v1/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                AdapterError::configuration(format!("bad chat completions endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            metadata: AdapterMetadata::new("openai", config.model),
            api_key: config.api_key,
            timeout: config.timeout,
        })
    }

    fn build_request<'a>(&'a self, request: &'a InferenceRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: self.metadata.model(),
            messages: request.messages().iter().map(map_message).collect(),
            temperature: request.temperature(),
            max_tokens: request.max_output_tokens(),
            stream: false,
        }
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        let http_request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build OpenAI request: {err}"))
            })?;

        debug!(
            model = self.metadata.model(),
            messages = request.messages().len(),
            "chat completion"
        );
        let bytes = execute(&self.client, http_request, self.timeout, "OpenAI").await?;

        let response: ChatCompletionResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode OpenAI response: {err}"))
        })?;
        let content = first_content(response)?;

        let stream = stream::once(async move { Ok(InferenceChunk::new(content, true)) });
        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_message(message: &ChatMessage) -> OpenAiMessage<'_> {
    OpenAiMessage {
        role: message.role().as_str(),
        content: message.content(),
    }
}

fn first_content(response: ChatCompletionResponse) -> AdapterResult<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.and_then(|message| message.content))
        .ok_or_else(|| AdapterError::response("OpenAI response contained no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(OpenAiConfig::new("sk-test", DEFAULT_CHAT_MODEL)).unwrap()
    }

    #[test]
    fn blank_key_or_model_is_rejected() {
        for config in [
            OpenAiConfig::new(" ", DEFAULT_CHAT_MODEL),
            OpenAiConfig::new("sk-test", ""),
        ] {
            assert!(matches!(
                OpenAiAdapter::new(config),
                Err(AdapterError::Configuration { .. })
            ));
        }
    }

    #[test]
    fn compatible_servers_get_the_completions_path() {
        let config = OpenAiConfig::new("sk-test", "local-model")
            .with_base_url("http://localhost:1234/proxy")
            .unwrap();
        let adapter = OpenAiAdapter::new(config).unwrap();
        assert_eq!(
            adapter.endpoint.to_string(),
            "http://localhost:1234/proxy/v1/chat/completions"
        );
    }

    #[test]
    fn payload_keeps_roles_and_sampling() {
        let request = InferenceRequest::new(vec![
            ChatMessage::system("Answer in one sentence."),
            ChatMessage::user("Who will win the election?"),
        ])
        .unwrap()
        .with_temperature(0.2);

        let json = serde_json::to_value(adapter().build_request(&request)).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Who will win the election?");
        assert_eq!(json["stream"], false);
        assert!(json.get("max_tokens").is_none());
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn first_non_empty_choice_wins() {
        let json = r#"{"choices":[{"message":{"content":null}},
                                  {"message":{"content":"Paris is the capital."}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_content(parsed).unwrap(), "Paris is the capital.");
    }

    #[test]
    fn no_choices_is_a_response_error() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(parsed), Err(AdapterError::Response { .. })));
    }

    #[test]
    fn key_stays_out_of_debug_output() {
        let config = OpenAiConfig::new("sk-secret", DEFAULT_CHAT_MODEL);
        assert!(!format!("{config:?}").contains("sk-secret"));
        assert!(!format!("{:?}", adapter()).contains("sk-test"));
    }
}
