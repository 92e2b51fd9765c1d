//! Vector store traits and a local in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::embeddings::EmbeddingVector;
use crate::{MemoryError, MemoryResult};

/// Similarity metric an index is created with. Fixed for the life of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity in `[-1, 1]`.
    #[default]
    Cosine,
    /// Euclidean distance mapped to `1 / (1 + d)`, so identical vectors score 1.
    Euclidean,
    /// Raw inner product.
    DotProduct,
}

impl SimilarityMetric {
    /// Scores two vectors; higher always means more similar.
    #[must_use]
    pub fn score(self, lhs: &EmbeddingVector, rhs: &EmbeddingVector) -> f32 {
        match self {
            Self::Cosine => {
                let denominator = lhs.magnitude() * rhs.magnitude();
                if denominator == 0.0 {
                    0.0
                } else {
                    lhs.dot(rhs) / denominator
                }
            }
            Self::Euclidean => 1.0 / (1.0 + lhs.euclidean_distance(rhs)),
            Self::DotProduct => lhs.dot(rhs),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        })
    }
}

impl FromStr for SimilarityMetric {
    type Err = MemoryError;

    /// Accepts the hosted index names (`dotproduct`) as well as the
    /// snake-case spelling used in profiles.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" | "dot_product" => Ok(Self::DotProduct),
            _ => Err(MemoryError::InvalidConfig("unknown similarity metric")),
        }
    }
}

/// Entry written to a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    id: String,
    embedding: EmbeddingVector,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl VectorPoint {
    /// Creates a point addressed by `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, embedding: EmbeddingVector) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: Map::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the embedding reference.
    #[must_use]
    pub fn embedding(&self) -> &EmbeddingVector {
        &self.embedding
    }

    /// Returns the metadata payload.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// Nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    embedding: EmbeddingVector,
    top_k: NonZeroUsize,
    include_metadata: bool,
}

impl VectorQuery {
    /// Creates a query returning up to `top_k` matches with metadata.
    #[must_use]
    pub fn new(embedding: EmbeddingVector, top_k: NonZeroUsize) -> Self {
        Self {
            embedding,
            top_k,
            include_metadata: true,
        }
    }

    /// Controls whether matches carry their metadata.
    #[must_use]
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    /// Returns the embedding driving the query.
    #[must_use]
    pub fn embedding(&self) -> &EmbeddingVector {
        &self.embedding
    }

    /// Returns the desired number of results.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k.get()
    }

    /// Returns whether metadata is requested.
    #[must_use]
    pub fn include_metadata(&self) -> bool {
        self.include_metadata
    }
}

/// Match returned from a vector store query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl VectorMatch {
    /// Creates a match structure.
    #[must_use]
    pub fn new(id: impl Into<String>, score: f32, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            score,
            metadata,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the similarity score under the index metric.
    #[must_use]
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Returns metadata payload.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns a string metadata field, if present.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Interface for vector store clients.
///
/// `upsert` with an existing id replaces the previous point outright.
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    /// Dimension every stored and queried vector must have.
    fn dimension(&self) -> usize;

    /// Inserts or replaces a point.
    async fn upsert(&self, point: VectorPoint) -> MemoryResult<()>;

    /// Executes a similarity query and returns matches ordered by descending score.
    async fn query(&self, query: VectorQuery) -> MemoryResult<Vec<VectorMatch>>;
}

/// In-process vector store with a fixed metric and dimension.
#[derive(Debug)]
pub struct LocalVectorStore {
    metric: SimilarityMetric,
    dimension: usize,
    points: RwLock<HashMap<String, VectorPoint>>,
}

impl LocalVectorStore {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] when `dimension` is zero.
    pub fn new(metric: SimilarityMetric, dimension: usize) -> MemoryResult<Self> {
        if dimension == 0 {
            return Err(MemoryError::InvalidConfig(
                "vector store dimension must be non-zero",
            ));
        }
        Ok(Self {
            metric,
            dimension,
            points: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the metric the store was created with.
    #[must_use]
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Number of stored points.
    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    /// Whether the store holds no points.
    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    /// Returns a copy of the point stored under `id`.
    pub async fn get(&self, id: &str) -> Option<VectorPoint> {
        self.points.read().await.get(id).cloned()
    }
}

#[async_trait]
impl VectorStoreClient for LocalVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, point: VectorPoint) -> MemoryResult<()> {
        point.embedding().ensure_dimension(self.dimension)?;
        let mut guard = self.points.write().await;
        guard.insert(point.id().to_owned(), point);
        Ok(())
    }

    async fn query(&self, query: VectorQuery) -> MemoryResult<Vec<VectorMatch>> {
        query.embedding().ensure_dimension(self.dimension)?;
        let guard = self.points.read().await;

        let mut matches: Vec<VectorMatch> = guard
            .values()
            .map(|point| {
                let metadata = if query.include_metadata() {
                    point.metadata().clone()
                } else {
                    Map::new()
                };
                VectorMatch::new(
                    point.id(),
                    self.metric.score(point.embedding(), query.embedding()),
                    metadata,
                )
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(query.top_k());
        Ok(matches)
    }
}
