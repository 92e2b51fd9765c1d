//! Conversation memory for recall-chat.
//!
//! A memory entry pairs a user query with the reply produced for it. The
//! query's embedding is the lookup key in a nearest-neighbour index, so a
//! later turn with the same (or a near-identical) question can be answered
//! from memory instead of calling the completion provider again.

#![warn(missing_docs, clippy::pedantic)]

pub mod embeddings;
pub mod error;
pub mod recall;
pub mod record;
pub mod vector_store_api;

pub use embeddings::{EmbeddingProvider, EmbeddingVector};
pub use error::{MemoryError, MemoryResult};
pub use recall::{MemoryIndex, Recall};
pub use record::{MAX_KEY_LEN, MemoryRecord, QUERY_FIELD, RESPONSE_FIELD};
pub use vector_store_api::{
    LocalVectorStore, SimilarityMetric, VectorMatch, VectorPoint, VectorQuery, VectorStoreClient,
};
