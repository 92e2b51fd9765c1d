//! Scripted collaborators for turn controller tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_adapters::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, AuxiliaryCapability,
    InferenceChunk, InferenceRequest, ModelAdapter,
};
use chat_config::{PipelineProfile, RetrySettings};
use chat_kernel::TurnController;
use chat_memory::{
    EmbeddingProvider, EmbeddingVector, LocalVectorStore, MemoryError, MemoryResult,
    SimilarityMetric, VectorMatch, VectorPoint, VectorQuery, VectorStoreClient,
};
use futures::stream;

pub const DIMENSION: usize = 32;

/// Deterministic embedder: the same text always yields the same vector and
/// different texts yield nearly orthogonal ones.
#[derive(Default)]
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> MemoryResult<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });
        let values = (0..DIMENSION)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                #[allow(clippy::cast_precision_loss)]
                let unit = (state >> 11) as f32 / (1_u64 << 53) as f32;
                unit * 2.0 - 1.0
            })
            .collect();
        EmbeddingVector::new(values)
    }
}

/// Completion adapter that plays back a script, then a default reply.
pub struct ScriptedAdapter {
    metadata: AdapterMetadata,
    script: Mutex<VecDeque<AdapterResult<String>>>,
    fallback: String,
    requests: Mutex<Vec<InferenceRequest>>,
    delay: Option<Duration>,
}

impl ScriptedAdapter {
    pub fn replying(fallback: &str) -> Self {
        Self {
            metadata: AdapterMetadata::new("scripted", "test-model"),
            script: Mutex::new(VecDeque::new()),
            fallback: fallback.to_owned(),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn then(self, step: AdapterResult<String>) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn hanging(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        let content = step?;
        Ok(Box::pin(stream::once(async move {
            Ok(InferenceChunk::new(content, true))
        })))
    }
}

/// Local store that counts calls and can be told to fail.
pub struct RecordingStore {
    inner: LocalVectorStore,
    queries: AtomicUsize,
    upserts: AtomicUsize,
    transient_query_failures: AtomicUsize,
    reject_upserts: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: LocalVectorStore::new(SimilarityMetric::Cosine, DIMENSION).unwrap(),
            queries: AtomicUsize::new(0),
            upserts: AtomicUsize::new(0),
            transient_query_failures: AtomicUsize::new(0),
            reject_upserts: AtomicBool::new(false),
        }
    }

    pub fn failing_queries(self, times: usize) -> Self {
        self.transient_query_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn rejecting_upserts(self) -> Self {
        self.reject_upserts.store(true, Ordering::SeqCst);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, key: &str) -> Option<VectorPoint> {
        self.inner.get(key).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl VectorStoreClient for RecordingStore {
    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn upsert(&self, point: VectorPoint) -> MemoryResult<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.reject_upserts.load(Ordering::SeqCst) {
            return Err(MemoryError::vector_store("index is read-only"));
        }
        self.inner.upsert(point).await
    }

    async fn query(&self, query: VectorQuery) -> MemoryResult<Vec<VectorMatch>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let remaining = self.transient_query_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_query_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(MemoryError::unavailable("503 from index"));
        }
        self.inner.query(query).await
    }
}

/// Capability that echoes its argument.
pub struct Echo;

#[async_trait]
impl AuxiliaryCapability for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "repeat the argument"
    }

    async fn invoke(&self, input: Option<&str>) -> AdapterResult<String> {
        input
            .map(str::to_owned)
            .ok_or_else(|| AdapterError::invalid_request("echo needs an argument"))
    }
}

/// Stock profile with a retry budget small enough for tests.
pub fn fast_profile() -> PipelineProfile {
    PipelineProfile {
        retry: RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
            call_timeout_ms: 200,
        },
        ..PipelineProfile::default()
    }
}

pub struct Harness {
    pub embedder: Arc<HashEmbedder>,
    pub store: Arc<RecordingStore>,
    pub adapter: Arc<ScriptedAdapter>,
    pub controller: TurnController,
}

pub fn harness_with(
    profile: &PipelineProfile,
    store: RecordingStore,
    adapter: ScriptedAdapter,
) -> Harness {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(store);
    let adapter = Arc::new(adapter);
    let controller = TurnController::from_profile(
        profile,
        embedder.clone(),
        store.clone(),
        adapter.clone(),
    )
    .unwrap();
    Harness {
        embedder,
        store,
        adapter,
        controller,
    }
}

pub fn harness(adapter: ScriptedAdapter) -> Harness {
    harness_with(&fast_profile(), RecordingStore::new(), adapter)
}
