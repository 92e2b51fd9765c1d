//! The unit of conversation memory.

use serde::{Deserialize, Serialize};

use crate::embeddings::EmbeddingVector;
use crate::vector_store_api::{VectorMatch, VectorPoint};
use crate::{MemoryError, MemoryResult};

/// Metadata field carrying the stored reply.
pub const RESPONSE_FIELD: &str = "response";
/// Metadata field carrying the originating query.
pub const QUERY_FIELD: &str = "query";
/// Longest key, in UTF-8 bytes, a record may carry.
///
/// Hosted indexes cap point ids at 512 characters. Counting bytes keeps every
/// accepted key under that cap whatever the script.
pub const MAX_KEY_LEN: usize = 512;

/// A query, the embedding of that query, and the reply produced for it.
///
/// `vector` must be the embedding of `key`; storing a vector derived from the
/// response (or a placeholder) makes nearest-neighbour lookup meaningless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    key: String,
    vector: EmbeddingVector,
    response: String,
}

impl MemoryRecord {
    /// Creates a record.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidRecord`] when the key or response is blank,
    /// or the key is longer than [`MAX_KEY_LEN`] bytes.
    pub fn new(
        key: impl Into<String>,
        vector: EmbeddingVector,
        response: impl Into<String>,
    ) -> MemoryResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(MemoryError::InvalidRecord("memory key must not be empty"));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(MemoryError::InvalidRecord("memory key exceeds 512 bytes"));
        }
        let response = response.into();
        if response.trim().is_empty() {
            return Err(MemoryError::InvalidRecord(
                "memory response must not be empty",
            ));
        }
        Ok(Self {
            key,
            vector,
            response,
        })
    }

    /// The originating query, used verbatim as the point id.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The query embedding.
    #[must_use]
    pub fn vector(&self) -> &EmbeddingVector {
        &self.vector
    }

    /// The stored reply.
    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Converts the record into a vector store point.
    #[must_use]
    pub fn into_point(self) -> VectorPoint {
        VectorPoint::new(self.key.clone(), self.vector)
            .with_metadata(QUERY_FIELD, self.key)
            .with_metadata(RESPONSE_FIELD, self.response)
    }
}

/// Extracts a usable stored reply from a match, if it carries one.
pub(crate) fn stored_response(candidate: &VectorMatch) -> Option<&str> {
    candidate
        .metadata_str(RESPONSE_FIELD)
        .filter(|response| !response.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> EmbeddingVector {
        EmbeddingVector::new(vec![0.1, 0.2]).unwrap()
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(MemoryRecord::new("  ", vector(), "reply text").is_err());
        assert!(MemoryRecord::new("query", vector(), "\n").is_err());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let at_limit = "a".repeat(MAX_KEY_LEN);
        assert!(MemoryRecord::new(at_limit, vector(), "reply text").is_ok());

        let over = "a".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            MemoryRecord::new(over, vector(), "reply text"),
            Err(MemoryError::InvalidRecord(_))
        ));

        // 171 three-byte characters: under the character cap, over the byte cap.
        let wide = "\u{20ac}".repeat(171);
        assert!(MemoryRecord::new(wide, vector(), "reply text").is_err());
    }

    #[test]
    fn point_is_keyed_by_query() {
        let point = MemoryRecord::new("What is Rust?", vector(), "A systems language.")
            .unwrap()
            .into_point();
        assert_eq!(point.id(), "What is Rust?");
        assert_eq!(point.metadata()[RESPONSE_FIELD], "A systems language.");
        assert_eq!(point.metadata()[QUERY_FIELD], "What is Rust?");
    }

    #[test]
    fn blank_stored_response_is_not_usable() {
        let mut metadata = serde_json::Map::new();
        metadata.insert(RESPONSE_FIELD.into(), "   ".into());
        let candidate = VectorMatch::new("k", 1.0, metadata);
        assert!(stored_response(&candidate).is_none());
    }
}
