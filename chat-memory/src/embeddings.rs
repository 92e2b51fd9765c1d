//! Embedding vectors and the provider interface that produces them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{MemoryError, MemoryResult};

/// Immutable, validated embedding. Cloning is cheap.
#[derive(Clone, PartialEq)]
pub struct EmbeddingVector {
    values: Arc<[f32]>,
}

impl EmbeddingVector {
    /// Creates a new embedding from owned values.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidRecord`] when the supplied vector is empty
    /// or contains non-finite values.
    pub fn new(values: Vec<f32>) -> MemoryResult<Self> {
        if values.is_empty() {
            return Err(MemoryError::InvalidRecord(
                "embedding vector must not be empty",
            ));
        }
        if !values.iter().all(|value| value.is_finite()) {
            return Err(MemoryError::InvalidRecord(
                "embedding vector contains non-finite values",
            ));
        }
        Ok(Self {
            values: Arc::from(values),
        })
    }

    /// Returns an immutable view of the embedding data.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Returns the dimensionality of the embedding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed vector; provided for clippy's sake.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fails unless the vector has exactly `expected` components.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::DimensionMismatch`] on a mismatch.
    pub fn ensure_dimension(&self, expected: usize) -> MemoryResult<()> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(MemoryError::DimensionMismatch {
                expected,
                actual: self.len(),
            })
        }
    }

    pub(crate) fn dot(&self, other: &Self) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub(crate) fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub(crate) fn euclidean_distance(&self, other: &Self) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl std::fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingVector")
            .field("dimensions", &self.len())
            .finish()
    }
}

impl Serialize for EmbeddingVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.values.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EmbeddingVector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<f32>::deserialize(deserializer)?;
        Self::new(values).map_err(serde::de::Error::custom)
    }
}

/// Converts text into a fixed-length vector.
///
/// Implementations must be deterministic enough that embedding the same text
/// twice lands the two vectors next to each other in the index, and must
/// always return vectors of [`EmbeddingProvider::dimension`] components.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Number of components in every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embeds `text`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Embedding`] when the provider rejects the input
    /// and [`MemoryError::Unavailable`] when it cannot be reached.
    async fn embed(&self, text: &str) -> MemoryResult<EmbeddingVector>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_vectors() {
        let err = EmbeddingVector::new(vec![]).expect_err("empty vector should error");
        assert!(matches!(err, MemoryError::InvalidRecord(_)));
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = EmbeddingVector::new(vec![1.0, f32::INFINITY]).expect_err("inf not allowed");
        assert!(matches!(err, MemoryError::InvalidRecord(_)));
    }

    #[test]
    fn dimension_check_reports_both_sides() {
        let embedding = EmbeddingVector::new(vec![0.5; 3]).unwrap();
        assert!(embedding.ensure_dimension(3).is_ok());
        let err = embedding.ensure_dimension(1536).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 1536,
                actual: 3
            }
        ));
    }

    #[test]
    fn deserialization_validates() {
        let err = serde_json::from_str::<EmbeddingVector>("[]").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
