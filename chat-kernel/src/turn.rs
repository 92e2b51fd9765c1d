//! The per-turn protocol.
//!
//! A turn validates the input, records it, then answers it in one of three
//! ways: a registered `/command` goes to its auxiliary capability; otherwise
//! the input is embedded and the nearest stored reply is served if it is
//! close enough; otherwise the input is classified, the matching instruction
//! is sent to the completion provider, and a worthwhile reply is stored
//! under the input for next time.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chat_adapters::{AuxiliaryCapability, InferenceRequest, ModelAdapter};
use chat_config::PipelineProfile;
use chat_memory::{
    EmbeddingProvider, EmbeddingVector, MemoryIndex, MemoryRecord, VectorStoreClient,
};
use chat_policy::{Intent, IntentClassifier, ReplyFilter};
use chat_primitives::{ChatMessage, SessionId};
use chat_prompts::{HistoryWindow, PromptBook};
use chat_telemetry::{TurnEvent, TurnKind, TurnObserver};
use tracing::{debug, warn};

use crate::auxiliary::{AuxiliaryRegistry, Command};
use crate::error::{Stage, TurnError, TurnResult};
use crate::retry::RetryPolicy;
use crate::session::{ChatSession, SessionRegistry};

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input. The transcript was not touched.
    Ignored,
    /// Served from memory; no completion call was made.
    Recalled {
        /// Reply as appended, including the recall marker.
        reply: String,
        /// Similarity of the stored match.
        score: f32,
    },
    /// Produced by the completion provider.
    Generated {
        /// Reply as appended, including the refusal marker if any.
        reply: String,
        /// Branch that chose the instruction.
        intent: Intent,
        /// Whether the reply was written to memory.
        stored: bool,
    },
    /// Produced by an auxiliary capability.
    Auxiliary {
        /// Capability output.
        reply: String,
        /// Capability name.
        capability: String,
    },
    /// Aborted; a notice was appended instead of a reply.
    Failed {
        /// Notice as appended.
        notice: String,
        /// Cause.
        error: TurnError,
    },
}

impl TurnOutcome {
    /// The assistant reply, if the turn produced one.
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Recalled { reply, .. }
            | Self::Generated { reply, .. }
            | Self::Auxiliary { reply, .. } => Some(reply),
            Self::Ignored | Self::Failed { .. } => None,
        }
    }

    fn kind(&self) -> TurnKind {
        match self {
            Self::Ignored => TurnKind::Ignored,
            Self::Recalled { score, .. } => TurnKind::Recalled { score: *score },
            Self::Generated { intent, stored, .. } => TurnKind::Generated {
                intent: *intent,
                stored: *stored,
            },
            Self::Auxiliary { capability, .. } => TurnKind::Auxiliary {
                capability: capability.clone(),
            },
            Self::Failed { error, .. } => TurnKind::Failed {
                stage: error.stage().map_or("turn", Stage::as_str),
                reason: error.to_string(),
            },
        }
    }
}

/// Completion request knobs taken from the profile.
#[derive(Debug, Clone, Copy, Default)]
struct Sampling {
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

/// Runs turns against one set of collaborators.
pub struct TurnController {
    embedder: Arc<dyn EmbeddingProvider>,
    memory: MemoryIndex,
    adapter: Arc<dyn ModelAdapter>,
    classifier: IntentClassifier,
    prompts: PromptBook,
    history: HistoryWindow,
    filter: ReplyFilter,
    recall_prefix: String,
    refusal_prefix: String,
    sampling: Sampling,
    retry: RetryPolicy,
    auxiliary: AuxiliaryRegistry,
    observer: Option<Arc<dyn TurnObserver>>,
}

impl fmt::Debug for TurnController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.adapter.metadata();
        f.debug_struct("TurnController")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .field("memory", &self.memory)
            .field("retry", &self.retry)
            .field("auxiliary", &self.auxiliary)
            .field("observer_configured", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl TurnController {
    /// Assembles a controller from a profile and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::Setup`] if the embedder and store disagree on
    /// dimension or the profile's rules or templates are unusable.
    pub fn from_profile(
        profile: &PipelineProfile,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreClient>,
        adapter: Arc<dyn ModelAdapter>,
    ) -> TurnResult<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(TurnError::setup(format!(
                "embedding dimension {} does not match index dimension {}",
                embedder.dimension(),
                store.dimension()
            )));
        }
        profile
            .validate()
            .map_err(|err| TurnError::setup(err.to_string()))?;
        let classifier = profile
            .classifier()
            .map_err(|err| TurnError::setup(err.to_string()))?;

        Ok(Self {
            embedder,
            memory: MemoryIndex::new(store, profile.recall_threshold),
            adapter,
            classifier,
            prompts: profile.prompts.clone(),
            history: profile.history_window,
            filter: profile.reply_filter(),
            recall_prefix: profile.recall_prefix.clone(),
            refusal_prefix: profile.refusal_prefix.clone(),
            sampling: Sampling {
                temperature: profile.temperature,
                max_output_tokens: profile.max_output_tokens,
            },
            retry: RetryPolicy::from_settings(&profile.retry),
            auxiliary: AuxiliaryRegistry::new(),
            observer: None,
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Installs the auxiliary capabilities reachable via `/name`.
    #[must_use]
    pub fn with_auxiliary(mut self, auxiliary: AuxiliaryRegistry) -> Self {
        self.auxiliary = auxiliary;
        self
    }

    /// Installs an observer notified after every turn.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Registered auxiliary capabilities.
    #[must_use]
    pub fn auxiliary(&self) -> &AuxiliaryRegistry {
        &self.auxiliary
    }

    /// Runs one turn against `session`.
    ///
    /// Blank input leaves the session untouched. Otherwise the input is
    /// appended, and then either the reply or, if a collaborator failed
    /// beyond the retry budget, a system notice. The session stays usable
    /// either way.
    pub async fn run_turn(&self, session: &mut ChatSession, input: &str) -> TurnOutcome {
        let started = Instant::now();

        let outcome = if let Err(err) = validate_input(input) {
            debug!(session = %session.id(), error = %err, "turn dropped");
            TurnOutcome::Ignored
        } else {
            let prior = session.transcript().len();
            session.record(ChatMessage::user(input));

            let answered = self
                .answer(&session.transcript().messages()[..prior], input)
                .await;
            match answered {
                Ok(outcome) => {
                    if let Some(reply) = outcome.reply() {
                        session.record(ChatMessage::assistant(reply));
                    }
                    outcome
                }
                Err(error) => {
                    let notice = failure_notice(&error);
                    session.record(ChatMessage::system(notice.clone()));
                    TurnOutcome::Failed { notice, error }
                }
            }
        };

        self.notify(session.id(), &outcome, started);
        outcome
    }

    /// Runs one turn for a registered session, waiting for any turn already
    /// in progress on that session.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::UnknownSession`] if `id` is not registered.
    pub async fn submit(
        &self,
        registry: &SessionRegistry,
        id: SessionId,
        input: &str,
    ) -> TurnResult<TurnOutcome> {
        let handle = registry
            .get(id)
            .await
            .ok_or(TurnError::UnknownSession { id })?;
        let mut session = handle.lock().await;
        Ok(self.run_turn(&mut session, input).await)
    }

    async fn answer(&self, prior: &[ChatMessage], input: &str) -> TurnResult<TurnOutcome> {
        if let Some((capability, command)) = self.auxiliary.resolve(input) {
            return self.invoke(capability, command).await;
        }

        let vector = self
            .retry
            .run(Stage::Embedding, || self.embedder.embed(input))
            .await?;

        if let Some(hit) = self
            .retry
            .run(Stage::Recall, || self.memory.recall(&vector))
            .await?
        {
            debug!(key = %hit.key, score = hit.score, "memory hit");
            return Ok(TurnOutcome::Recalled {
                reply: format!("{}{}", self.recall_prefix, hit.response),
                score: hit.score,
            });
        }

        let intent = self.classifier.classify(input);
        let instruction = self.prompts.instruction(intent)?;
        let request = self.request(self.history.assemble(&instruction, prior, input))?;

        let generated = self
            .retry
            .run(Stage::Completion, || self.adapter.complete(request.clone()))
            .await?;
        if generated.is_empty() {
            return Err(TurnError::Provider {
                stage: Stage::Completion,
                reason: "provider returned an empty reply".to_owned(),
                retryable: false,
            });
        }

        let reply = match intent {
            Intent::Refusal => format!("{}{generated}", self.refusal_prefix),
            Intent::Opinion | Intent::General => generated.clone(),
        };

        let stored = self.filter.admits(&generated) && self.remember(input, vector, &reply).await;

        Ok(TurnOutcome::Generated {
            reply,
            intent,
            stored,
        })
    }

    async fn invoke(
        &self,
        capability: &Arc<dyn AuxiliaryCapability>,
        command: Command<'_>,
    ) -> TurnResult<TurnOutcome> {
        debug!(capability = command.name, "auxiliary command");
        let reply = self
            .retry
            .run(Stage::Auxiliary, || capability.invoke(command.argument))
            .await?;
        Ok(TurnOutcome::Auxiliary {
            reply,
            capability: command.name.to_owned(),
        })
    }

    fn request(&self, messages: Vec<ChatMessage>) -> TurnResult<InferenceRequest> {
        let mut request = InferenceRequest::new(messages)
            .map_err(|err| TurnError::provider(Stage::Prompt, &err))?;
        if let Some(temperature) = self.sampling.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(tokens) = self.sampling.max_output_tokens {
            request = request.with_max_output_tokens(tokens);
        }
        Ok(request)
    }

    /// Stores `reply` under `input` with the query vector. A failure here is
    /// logged and swallowed; the reply has already been produced.
    async fn remember(&self, input: &str, vector: EmbeddingVector, reply: &str) -> bool {
        let record = match MemoryRecord::new(input, vector, reply) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "reply not storable");
                return false;
            }
        };
        match self
            .retry
            .run(Stage::Remember, || self.memory.remember(record.clone()))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "memory write dropped");
                false
            }
        }
    }

    fn notify(&self, session: SessionId, outcome: &TurnOutcome, started: Instant) {
        if let Some(observer) = &self.observer {
            observer.on_turn(&TurnEvent {
                session,
                kind: outcome.kind(),
                elapsed: started.elapsed(),
            });
        }
    }
}

fn validate_input(input: &str) -> TurnResult<()> {
    if input.trim().is_empty() {
        return Err(TurnError::Validation {
            reason: "input is empty",
        });
    }
    Ok(())
}

fn failure_notice(error: &TurnError) -> String {
    match error.stage() {
        Some(stage) => format!(
            "Sorry, the {stage} step failed and this message was not answered ({error}). \
             Please try again."
        ),
        None => format!("Sorry, this message was not answered ({error}). Please try again."),
    }
}
