//! Wires configuration to concrete providers.

use std::sync::Arc;

use chat_adapters::{
    AdapterError, OpenAiAdapter, OpenAiConfig, OpenAiEmbedder, OpenAiEmbeddingConfig,
    PineconeConfig, PineconeStore, WebSearch, DEFAULT_CHAT_MODEL,
};
use chat_config::{ChatConfig, ConfigError, MemoryBackend, PipelineProfile};
use chat_kernel::{AuxiliaryRegistry, TurnController, TurnError};
use chat_memory::{EmbeddingProvider, LocalVectorStore, MemoryError, VectorStoreClient};
use chat_telemetry::TracingTurnObserver;
use thiserror::Error;
use tracing::info;

/// Startup failures. Any of these ends the process before the first turn.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Credentials or profile were unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A provider client could not be built or reached.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The local index could not be created.
    #[error(transparent)]
    Memory(#[from] MemoryError),
    /// The collaborators did not fit together.
    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// Knobs the command line may override.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Chat model, taking precedence over the environment.
    pub model: Option<String>,
    /// Register the `/search` capability.
    pub web_search: bool,
}

/// Builds a controller from environment settings and a profile.
///
/// With a hosted backend this contacts the vector index controller to find
/// the data-plane host unless one was configured.
///
/// # Errors
///
/// Returns [`SetupError`] if a client cannot be constructed, the hosted index
/// cannot be described, or the embedding and index dimensions disagree.
pub async fn build_controller(
    config: &ChatConfig,
    profile: &PipelineProfile,
    options: &AppOptions,
) -> Result<TurnController, SetupError> {
    profile.validate()?;
    let call_timeout = profile.retry.call_timeout();

    let model = options
        .model
        .as_deref()
        .or(config.chat_model.as_deref())
        .unwrap_or(DEFAULT_CHAT_MODEL);
    let mut chat = OpenAiConfig::new(&config.openai_api_key, model).with_timeout(call_timeout);
    let mut embeddings =
        OpenAiEmbeddingConfig::new(&config.openai_api_key).with_timeout(call_timeout);
    if let Some(base_url) = &config.openai_base_url {
        chat = chat.with_base_url(base_url)?;
        embeddings = embeddings.with_base_url(base_url)?;
    }
    if let Some((model, dimension)) = &config.embedding_model {
        embeddings = embeddings.with_model(model, *dimension);
    }

    let adapter = Arc::new(OpenAiAdapter::new(chat)?);
    let embedder = Arc::new(OpenAiEmbedder::new(embeddings)?);
    let dimension = embedder.dimension();

    let store: Arc<dyn VectorStoreClient> = match &config.memory {
        MemoryBackend::Hosted(credentials) => {
            let mut pinecone = PineconeConfig::new(
                &credentials.api_key,
                &credentials.index,
                &credentials.environment,
                dimension,
            )
            .with_timeout(call_timeout);
            if let Some(host) = &credentials.host {
                pinecone = pinecone.with_host(host);
            }
            if let Some(metric) = credentials.metric {
                pinecone = pinecone.with_metric(metric);
            }
            info!(index = %credentials.index, "using hosted memory");
            Arc::new(PineconeStore::connect(pinecone).await?)
        }
        MemoryBackend::Local => {
            info!(metric = %profile.metric, dimension, "using in-process memory");
            Arc::new(LocalVectorStore::new(profile.metric, dimension)?)
        }
    };

    let mut auxiliary = AuxiliaryRegistry::new();
    if options.web_search {
        auxiliary.register(Arc::new(WebSearch::new()?.with_timeout(call_timeout)))?;
    }

    Ok(
        TurnController::from_profile(profile, embedder, store, adapter)?
            .with_auxiliary(auxiliary)
            .with_observer(Arc::new(TracingTurnObserver)),
    )
}
