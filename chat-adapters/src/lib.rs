//! Provider adapters for recall-chat.
//!
//! Each adapter wraps one external service behind a trait the kernel owns:
//! chat completions behind [`traits::ModelAdapter`], embeddings behind
//! [`chat_memory::EmbeddingProvider`], the vector index behind
//! [`chat_memory::VectorStoreClient`] and one-shot helpers behind
//! [`traits::AuxiliaryCapability`].

#![warn(missing_docs, clippy::pedantic)]

mod http_client;

pub mod openai;
pub mod openai_embeddings;
pub mod pinecone;
pub mod traits;
pub mod web_search;

pub use openai::{DEFAULT_CHAT_MODEL, OpenAiAdapter, OpenAiConfig};
pub use openai_embeddings::{
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, OpenAiEmbedder, OpenAiEmbeddingConfig,
};
pub use pinecone::{PineconeConfig, PineconeStore};
pub use traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, AuxiliaryCapability,
    InferenceChunk, InferenceRequest, ModelAdapter,
};
pub use web_search::WebSearch;
