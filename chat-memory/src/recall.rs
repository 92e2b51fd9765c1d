//! Lookup and storage protocol over a vector store.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingVector;
use crate::record::{MemoryRecord, stored_response};
use crate::vector_store_api::{VectorQuery, VectorStoreClient};
use crate::MemoryResult;

/// A stored reply found for the current query.
#[derive(Debug, Clone, PartialEq)]
pub struct Recall {
    /// Id of the matched point (the query it was stored under).
    pub key: String,
    /// Similarity score of the match.
    pub score: f32,
    /// The stored reply.
    pub response: String,
}

/// Memory facade used by the turn controller.
///
/// Only the single nearest match is considered. It counts as a hit when its
/// score reaches `min_score` and it carries a non-empty stored response.
#[derive(Clone)]
pub struct MemoryIndex {
    store: Arc<dyn VectorStoreClient>,
    min_score: f32,
}

impl std::fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("dimension", &self.store.dimension())
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

impl MemoryIndex {
    /// Wraps a store with the given hit threshold.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStoreClient>, min_score: f32) -> Self {
        Self { store, min_score }
    }

    /// Dimension of the underlying index.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Score a match must reach to count as a hit.
    #[must_use]
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Looks up the nearest stored reply for `vector`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn recall(&self, vector: &EmbeddingVector) -> MemoryResult<Option<Recall>> {
        let query = VectorQuery::new(vector.clone(), NonZeroUsize::MIN);
        let nearest = self.store.query(query).await?.into_iter().next();

        let Some(candidate) = nearest else {
            debug!("memory empty");
            return Ok(None);
        };

        if candidate.score() < self.min_score {
            debug!(
                key = candidate.id(),
                score = candidate.score(),
                min_score = self.min_score,
                "nearest memory below threshold"
            );
            return Ok(None);
        }

        Ok(stored_response(&candidate).map(|response| Recall {
            key: candidate.id().to_owned(),
            score: candidate.score(),
            response: response.to_owned(),
        }))
    }

    /// Stores a record, replacing any previous record with the same key.
    ///
    /// # Errors
    ///
    /// Propagates store failures, including dimension mismatches.
    pub async fn remember(&self, record: MemoryRecord) -> MemoryResult<()> {
        debug!(key = record.key(), "storing memory");
        self.store.upsert(record.into_point()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store_api::{LocalVectorStore, SimilarityMetric};

    fn index(min_score: f32) -> (Arc<LocalVectorStore>, MemoryIndex) {
        let store = Arc::new(LocalVectorStore::new(SimilarityMetric::Cosine, 2).unwrap());
        let index = MemoryIndex::new(store.clone(), min_score);
        (store, index)
    }

    fn vector(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn empty_store_misses() {
        let (_, index) = index(0.0);
        assert!(index.recall(&vector(&[1.0, 0.0])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_record_round_trips() {
        let (_, index) = index(0.9);
        let key_vector = vector(&[1.0, 0.0]);
        let record =
            MemoryRecord::new("hello there", key_vector.clone(), "General Kenobi!").unwrap();
        index.remember(record).await.unwrap();

        let recall = index.recall(&key_vector).await.unwrap().expect("hit");
        assert_eq!(recall.key, "hello there");
        assert_eq!(recall.response, "General Kenobi!");
    }

    #[tokio::test]
    async fn distant_match_is_a_miss() {
        let (_, index) = index(0.9);
        index
            .remember(MemoryRecord::new("east", vector(&[1.0, 0.0]), "points east").unwrap())
            .await
            .unwrap();
        assert!(index.recall(&vector(&[0.0, 1.0])).await.unwrap().is_none());
    }
}
