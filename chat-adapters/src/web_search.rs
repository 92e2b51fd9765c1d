//! Web search capability backed by the `DuckDuckGo` Instant Answer API.

use std::time::Duration;

use async_trait::async_trait;
use hyper::header::ACCEPT;
use hyper::{Body, Request};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::http_client::{HyperClient, build_https_client, execute};
use crate::traits::{AdapterError, AdapterResult, AuxiliaryCapability};

const INSTANT_ANSWER_URL: &str = "https://api.duckduckgo.com/";

/// Reply used when the search finds nothing worth quoting.
pub const NO_ANSWER: &str = "No instant answer found for that query.";

/// Looks up a short factual answer for a query.
#[derive(Debug)]
pub struct WebSearch {
    client: HyperClient,
    base: Url,
    timeout: Duration,
}

impl WebSearch {
    /// Creates a search capability against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint cannot be parsed.
    pub fn new() -> AdapterResult<Self> {
        Self::with_endpoint(INSTANT_ANSWER_URL)
    }

    /// Creates a search capability against a custom endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if `endpoint` is not a URL.
    pub fn with_endpoint(endpoint: &str) -> AdapterResult<Self> {
        let base = Url::parse(endpoint).map_err(|err| {
            AdapterError::configuration(format!("invalid search endpoint: {err}"))
        })?;
        Ok(Self {
            client: build_https_client(),
            base,
            timeout: Duration::from_secs(10),
        })
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn query_url(&self, query: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("no_html", "1")
            .append_pair("skip_disambig", "1");
        url
    }
}

#[async_trait]
impl AuxiliaryCapability for WebSearch {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "look up a short answer on the web"
    }

    async fn invoke(&self, input: Option<&str>) -> AdapterResult<String> {
        let query = input
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| AdapterError::invalid_request("search needs a query"))?;

        let url = self.query_url(query);
        debug!(%url, "web search");
        let request = Request::get(url.as_str())
            .header(ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(|err| {
                AdapterError::transport(format!("failed to build search request: {err}"))
            })?;

        let bytes = execute(&self.client, request, self.timeout, "DuckDuckGo").await?;
        let answer: InstantAnswer = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode search response: {err}"))
        })?;
        Ok(answer.best().unwrap_or_else(|| NO_ANSWER.to_owned()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    abstract_source: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
}

impl InstantAnswer {
    fn best(self) -> Option<String> {
        let answer = self.answer.trim();
        if !answer.is_empty() {
            return Some(answer.to_owned());
        }
        let summary = self.abstract_text.trim();
        if !summary.is_empty() {
            let source = self.abstract_source.trim();
            return Some(if source.is_empty() {
                summary.to_owned()
            } else {
                format!("{summary} ({source})")
            });
        }
        self.related_topics
            .into_iter()
            .filter_map(|topic| topic.text)
            .map(|text| text.trim().to_owned())
            .find(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> InstantAnswer {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn direct_answer_wins() {
        let answer = parse(r#"{"Answer":"42","AbstractText":"long text","RelatedTopics":[]}"#);
        assert_eq!(answer.best().as_deref(), Some("42"));
    }

    #[test]
    fn abstract_carries_its_source() {
        let answer = parse(
            r#"{"Answer":"","AbstractText":"Rust is a language.","AbstractSource":"Wikipedia"}"#,
        );
        assert_eq!(answer.best().as_deref(), Some("Rust is a language. (Wikipedia)"));
    }

    #[test]
    fn falls_back_to_related_topics() {
        let answer = parse(
            r#"{"Answer":"","AbstractText":"",
                "RelatedTopics":[{"Name":"group","Topics":[]},{"Text":"Ferris the crab"}]}"#,
        );
        assert_eq!(answer.best().as_deref(), Some("Ferris the crab"));
    }

    #[test]
    fn empty_response_has_no_answer() {
        assert!(parse("{}").best().is_none());
    }

    #[test]
    fn query_is_url_encoded() {
        let search = WebSearch::new().unwrap();
        let url = search.query_url("who is ferris & friends");
        assert_eq!(url.host_str(), Some("api.duckduckgo.com"));
        assert!(url.as_str().contains("q=who+is+ferris+%26+friends"));
        assert!(url.as_str().contains("format=json"));
    }

    #[tokio::test]
    async fn blank_query_is_rejected_locally() {
        let search = WebSearch::new().unwrap();
        let err = search.invoke(Some("  ")).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
        assert!(search.invoke(None).await.is_err());
    }
}
