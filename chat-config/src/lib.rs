//! Configuration for recall-chat.
//!
//! Two layers: [`ChatConfig`] holds process-wide credentials read once from
//! the environment, and [`PipelineProfile`] holds the tunable pipeline data
//! (prompts, keyword sets, similarity metric, markers, thresholds, retry
//! budget), loadable from TOML.

#![warn(missing_docs, clippy::pedantic)]

pub mod credentials;
pub mod error;
pub mod profile;

pub use credentials::{
    ChatConfig, MemoryBackend, MemoryMode, PineconeCredentials, CHAT_MODEL_ENV,
    EMBEDDING_DIMENSION_ENV, EMBEDDING_MODEL_ENV, OPENAI_API_KEY_ENV, OPENAI_BASE_URL_ENV,
    PINECONE_API_KEY_ENV, PINECONE_ENVIRONMENT_ENV, PINECONE_INDEX_ENV, PINECONE_INDEX_HOST_ENV,
    PINECONE_METRIC_ENV,
};
pub use error::{ConfigError, ConfigResult};
pub use profile::{
    DEFAULT_RECALL_PREFIX, DEFAULT_REFUSAL_PREFIX, PipelineProfile, RetrySettings,
};
