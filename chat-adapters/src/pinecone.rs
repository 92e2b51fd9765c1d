//! Pinecone vector store client.
//!
//! Talks to one index. The data-plane host is either configured directly or
//! resolved once at connect time from the environment's controller.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chat_memory::{
    EmbeddingVector, MemoryError, MemoryResult, SimilarityMetric, VectorMatch, VectorPoint,
    VectorQuery, VectorStoreClient,
};
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::http_client::{HyperClient, build_https_client, execute, normalize_base_url};
use crate::traits::{AdapterError, AdapterResult};

const API_KEY_HEADER: &str = "Api-Key";

/// Connection settings for one Pinecone index.
#[derive(Clone)]
pub struct PineconeConfig {
    api_key: String,
    index: String,
    environment: String,
    host: Option<String>,
    namespace: Option<String>,
    dimension: usize,
    metric: Option<SimilarityMetric>,
    timeout: Duration,
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("index", &self.index)
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .field("dimension", &self.dimension)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

impl PineconeConfig {
    /// Creates a configuration for `index` in `environment`.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        index: impl Into<String>,
        environment: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            index: index.into(),
            environment: environment.into(),
            host: None,
            namespace: None,
            dimension,
            metric: None,
            timeout: Duration::from_secs(20),
        }
    }

    /// Uses a known data-plane host instead of asking the controller.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Scopes reads and writes to a namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Declares the metric the index was created with.
    ///
    /// Needed when the host is configured directly, since the controller is
    /// never asked. Without it cosine is assumed.
    #[must_use]
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn controller_url(&self) -> String {
        format!(
            "https://controller.{}.pinecone.io/databases/{}",
            self.environment, self.index
        )
    }
}

/// [`VectorStoreClient`] for a hosted Pinecone index.
pub struct PineconeStore {
    client: HyperClient,
    upsert_endpoint: Uri,
    query_endpoint: Uri,
    api_key: String,
    namespace: Option<String>,
    dimension: usize,
    metric: SimilarityMetric,
    timeout: Duration,
}

impl fmt::Debug for PineconeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeStore")
            .field("query_endpoint", &self.query_endpoint)
            .field("dimension", &self.dimension)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

impl PineconeStore {
    /// Connects to the configured index, resolving its host if needed and
    /// checking that its dimension matches the configured one.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for blank credentials, a
    /// dimension mismatch or a metric that disagrees with the index, and
    /// transport/status errors from the controller.
    pub async fn connect(mut config: PineconeConfig) -> AdapterResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AdapterError::configuration("Pinecone requires an API key"));
        }
        if config.index.trim().is_empty() || config.environment.trim().is_empty() {
            return Err(AdapterError::configuration(
                "Pinecone requires an index name and an environment",
            ));
        }
        if config.dimension == 0 {
            return Err(AdapterError::configuration("index dimension must be non-zero"));
        }

        let client = build_https_client();
        let host = match &config.host {
            Some(host) => host.clone(),
            None => {
                let resolved = describe_index(&client, &config).await?;
                config.metric = Some(resolved.metric);
                resolved.host
            }
        };
        let base = normalize_base_url(&host, "Pinecone")?;
        info!(
            index = %config.index,
            environment = %config.environment,
            metric = %config.metric.unwrap_or_default(),
            %base,
            "connected to vector index"
        );

        Self::with_base(client, &base, config)
    }

    fn with_base(client: HyperClient, base: &str, config: PineconeConfig) -> AdapterResult<Self> {
        let endpoint = |path: &str| {
            format!("{base}{path}").parse::<Uri>().map_err(|err| {
                AdapterError::configuration(format!("invalid Pinecone endpoint: {err}"))
            })
        };
        Ok(Self {
            client,
            upsert_endpoint: endpoint("vectors/upsert")?,
            query_endpoint: endpoint("query")?,
            api_key: config.api_key,
            namespace: config.namespace,
            dimension: config.dimension,
            metric: config.metric.unwrap_or_default(),
            timeout: config.timeout,
        })
    }

    fn post(&self, endpoint: &Uri, body: Vec<u8>) -> AdapterResult<Request<Body>> {
        Request::post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build Pinecone request: {err}"))
            })
    }
}

#[async_trait]
impl VectorStoreClient for PineconeStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, point: VectorPoint) -> MemoryResult<()> {
        point.embedding().ensure_dimension(self.dimension)?;
        let payload = UpsertRequest {
            vectors: vec![WireVector {
                id: point.id(),
                values: point.embedding(),
                metadata: point.metadata(),
            }],
            namespace: self.namespace.as_deref(),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|err| MemoryError::vector_store(format!("failed to encode upsert: {err}")))?;
        let request = self.post(&self.upsert_endpoint, body).map_err(store_error)?;

        debug!(id = point.id(), "pinecone upsert");
        execute(&self.client, request, self.timeout, "Pinecone")
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn query(&self, query: VectorQuery) -> MemoryResult<Vec<VectorMatch>> {
        query.embedding().ensure_dimension(self.dimension)?;
        let payload = QueryRequest {
            vector: query.embedding(),
            top_k: query.top_k(),
            include_metadata: query.include_metadata(),
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|err| MemoryError::vector_store(format!("failed to encode query: {err}")))?;
        let request = self.post(&self.query_endpoint, body).map_err(store_error)?;

        let bytes = execute(&self.client, request, self.timeout, "Pinecone")
            .await
            .map_err(store_error)?;
        let matches = decode_matches(&bytes, self.metric)?;
        debug!(matches = matches.len(), metric = %self.metric, "pinecone query");
        Ok(matches)
    }
}

/// Decodes a query response into matches ordered best first, with scores
/// turned into similarities where higher always means closer.
fn decode_matches(bytes: &[u8], metric: SimilarityMetric) -> MemoryResult<Vec<VectorMatch>> {
    let response: QueryResponse = serde_json::from_slice(bytes).map_err(|err| {
        MemoryError::vector_store(format!("failed to decode query response: {err}"))
    })?;
    let mut matches: Vec<VectorMatch> = response
        .matches
        .into_iter()
        .map(|m| {
            let score = similarity(metric, m.score);
            VectorMatch::new(m.id, score, m.metadata.unwrap_or_default())
        })
        .collect();
    matches.sort_by(|a, b| b.score().total_cmp(&a.score()));
    Ok(matches)
}

/// Euclidean indexes report squared distance; map it onto the same
/// `1 / (1 + d)` scale the local store uses.
fn similarity(metric: SimilarityMetric, raw: f32) -> f32 {
    match metric {
        SimilarityMetric::Euclidean => 1.0 / (1.0 + raw.max(0.0).sqrt()),
        SimilarityMetric::Cosine | SimilarityMetric::DotProduct => raw,
    }
}

fn parse_metric(name: &str) -> AdapterResult<SimilarityMetric> {
    name.parse().map_err(|_| {
        AdapterError::configuration(format!("unsupported index metric `{}`", name.trim()))
    })
}

fn store_error(err: AdapterError) -> MemoryError {
    if err.is_transient() {
        MemoryError::unavailable(err.to_string())
    } else {
        MemoryError::vector_store(err.to_string())
    }
}

async fn describe_index(
    client: &HyperClient,
    config: &PineconeConfig,
) -> AdapterResult<ResolvedIndex> {
    let request = Request::get(config.controller_url())
        .header(ACCEPT, "application/json")
        .header(API_KEY_HEADER, &config.api_key)
        .body(Body::empty())
        .map_err(|err| {
            AdapterError::configuration(format!("invalid Pinecone controller URL: {err}"))
        })?;

    let bytes = execute(client, request, config.timeout, "Pinecone controller").await?;
    let description: IndexDescription = serde_json::from_slice(&bytes).map_err(|err| {
        AdapterError::response(format!("failed to decode index description: {err}"))
    })?;
    description.resolve(config.dimension, config.metric)
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a EmbeddingVector,
    metadata: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a EmbeddingVector,
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Accepts both the environment controller's `{database, status}` shape and
/// the flat shape served by the global control plane.
#[derive(Deserialize)]
struct IndexDescription {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    database: Option<DatabaseSection>,
    #[serde(default)]
    status: Option<StatusSection>,
}

#[derive(Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    metric: Option<String>,
}

#[derive(Deserialize)]
struct StatusSection {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    ready: Option<bool>,
}

struct ResolvedIndex {
    host: String,
    metric: SimilarityMetric,
}

impl IndexDescription {
    fn resolve(
        self,
        expected_dimension: usize,
        declared_metric: Option<SimilarityMetric>,
    ) -> AdapterResult<ResolvedIndex> {
        let dimension = self
            .dimension
            .or_else(|| self.database.as_ref().and_then(|db| db.dimension));
        if let Some(dimension) = dimension
            && dimension != expected_dimension
        {
            return Err(AdapterError::configuration(format!(
                "index dimension {dimension} does not match embedding dimension {expected_dimension}"
            )));
        }

        let reported = self
            .metric
            .as_deref()
            .or_else(|| self.database.as_ref().and_then(|db| db.metric.as_deref()))
            .map(parse_metric)
            .transpose()?;
        let metric = match (reported, declared_metric) {
            (Some(reported), Some(declared)) if reported != declared => {
                return Err(AdapterError::configuration(format!(
                    "index metric {reported} does not match configured metric {declared}"
                )));
            }
            (Some(metric), _) | (None, Some(metric)) => metric,
            (None, None) => SimilarityMetric::default(),
        };

        if self.status.as_ref().and_then(|status| status.ready) == Some(false) {
            return Err(AdapterError::transport("Pinecone index is not ready yet"));
        }
        let host = self
            .host
            .or_else(|| self.status.and_then(|status| status.host))
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| AdapterError::response("index description did not include a host"))?;
        Ok(ResolvedIndex { host, metric })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chat_memory::MemoryIndex;

    use super::*;

    fn store() -> PineconeStore {
        let config =
            PineconeConfig::new("key", "memory", "us-west1-gcp", 3).with_namespace("chat");
        PineconeStore::with_base(
            build_https_client(),
            "https://memory-abc.svc.pinecone.io/",
            config,
        )
        .unwrap()
    }

    #[test]
    fn endpoints_hang_off_the_host() {
        let store = store();
        assert_eq!(
            store.upsert_endpoint.to_string(),
            "https://memory-abc.svc.pinecone.io/vectors/upsert"
        );
        assert_eq!(
            store.query_endpoint.to_string(),
            "https://memory-abc.svc.pinecone.io/query"
        );
        assert_eq!(store.metric, SimilarityMetric::Cosine);
    }

    #[test]
    fn query_payload_uses_camel_case() {
        let vector = EmbeddingVector::new(vec![0.5, 0.25, 0.0]).unwrap();
        let payload = QueryRequest {
            vector: &vector,
            top_k: 1,
            include_metadata: true,
            include_values: false,
            namespace: Some("chat"),
        };
        let json = serde_json::to_value(payload).unwrap();
        assert_eq!(json["topK"], 1);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["vector"][1], 0.25);
        assert_eq!(json["namespace"], "chat");
    }

    #[test]
    fn controller_description_resolves_status_host() {
        let json = r#"{"database":{"name":"memory","dimension":1536,"metric":"cosine"},
                       "status":{"ready":true,"host":"memory-abc.svc.us-west1-gcp.pinecone.io"}}"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        let resolved = description.resolve(1536, None).unwrap();
        assert_eq!(resolved.host, "memory-abc.svc.us-west1-gcp.pinecone.io");
        assert_eq!(resolved.metric, SimilarityMetric::Cosine);
    }

    #[test]
    fn flat_description_resolves_top_level_host() {
        let json = r#"{"name":"memory","dimension":1536,"host":"memory-xyz.svc.aped.pinecone.io",
                       "status":{"ready":true}}"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        let resolved = description.resolve(1536, None).unwrap();
        assert_eq!(resolved.host, "memory-xyz.svc.aped.pinecone.io");
    }

    #[test]
    fn controller_reports_the_index_metric() {
        let json = r#"{"database":{"dimension":3,"metric":"euclidean"},
                       "status":{"ready":true,"host":"h"}}"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        assert_eq!(
            description.resolve(3, None).unwrap().metric,
            SimilarityMetric::Euclidean
        );

        let flat: IndexDescription =
            serde_json::from_str(r#"{"dimension":3,"metric":"dotproduct","host":"h"}"#).unwrap();
        assert_eq!(flat.resolve(3, None).unwrap().metric, SimilarityMetric::DotProduct);
    }

    #[test]
    fn declared_metric_must_agree_with_the_index() {
        let json = r#"{"dimension":3,"metric":"cosine","host":"h"}"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        assert!(matches!(
            description.resolve(3, Some(SimilarityMetric::Euclidean)),
            Err(AdapterError::Configuration { .. })
        ));

        let silent: IndexDescription = serde_json::from_str(r#"{"host":"h"}"#).unwrap();
        assert_eq!(
            silent
                .resolve(3, Some(SimilarityMetric::Euclidean))
                .unwrap()
                .metric,
            SimilarityMetric::Euclidean
        );
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let json = r#"{"dimension":3,"metric":"manhattan","host":"h"}"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        assert!(matches!(
            description.resolve(3, None),
            Err(AdapterError::Configuration { .. })
        ));
    }

    const EXACT_REPEAT: &str = r#"{"matches":[{"id":"What is Rust?","score":0.0,
        "metadata":{"query":"What is Rust?","response":"A systems language."}}]}"#;

    #[test]
    fn euclidean_distances_become_similarities() {
        let json = r#"{"matches":[{"id":"far","score":4.0},{"id":"near","score":0.0}]}"#;
        let matches = decode_matches(json.as_bytes(), SimilarityMetric::Euclidean).unwrap();
        assert_eq!(matches[0].id(), "near");
        assert!((matches[0].score() - 1.0).abs() < f32::EPSILON);
        assert!((matches[1].score() - 1.0 / 3.0).abs() < 1e-6);

        let cosine = decode_matches(json.as_bytes(), SimilarityMetric::Cosine).unwrap();
        assert_eq!(cosine[0].id(), "far");
    }

    /// Serves one canned query response, as the data plane would.
    struct CannedStore {
        body: &'static str,
        metric: SimilarityMetric,
    }

    #[async_trait]
    impl VectorStoreClient for CannedStore {
        fn dimension(&self) -> usize {
            3
        }

        async fn upsert(&self, _point: VectorPoint) -> MemoryResult<()> {
            Ok(())
        }

        async fn query(&self, _query: VectorQuery) -> MemoryResult<Vec<VectorMatch>> {
            decode_matches(self.body.as_bytes(), self.metric)
        }
    }

    #[tokio::test]
    async fn exact_repeat_on_a_euclidean_index_is_recalled() {
        let store = CannedStore {
            body: EXACT_REPEAT,
            metric: SimilarityMetric::Euclidean,
        };
        let index = MemoryIndex::new(Arc::new(store), 0.95);
        let vector = EmbeddingVector::new(vec![0.1, 0.2, 0.3]).unwrap();
        let recall = index.recall(&vector).await.unwrap().expect("exact repeat is a hit");
        assert_eq!(recall.response, "A systems language.");
        assert!((recall.score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let json = r#"{"dimension":768,"host":"h"}"#;
        let description: IndexDescription = serde_json::from_str(json).unwrap();
        assert!(matches!(
            description.resolve(1536, None),
            Err(AdapterError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn wrong_dimension_never_reaches_the_network() {
        let vector = EmbeddingVector::new(vec![1.0, 0.0]).unwrap();
        let err = store().upsert(VectorPoint::new("k", vector)).await.unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected() {
        let err = PineconeStore::connect(PineconeConfig::new("", "memory", "env", 3))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn store_errors_keep_transience() {
        assert!(store_error(AdapterError::transport("reset")).is_transient());
        assert!(matches!(
            store_error(AdapterError::response("nope")),
            MemoryError::VectorStore { .. }
        ));
    }
}
