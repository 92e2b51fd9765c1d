//! Turn-level errors.

use std::fmt;
use std::time::Duration;

use chat_adapters::AdapterError;
use chat_memory::MemoryError;
use chat_primitives::SessionId;
use chat_prompts::PromptError;
use thiserror::Error;

/// Step of a turn that talks to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Embedding the user input.
    Embedding,
    /// Nearest-neighbour lookup.
    Recall,
    /// Building the completion request.
    Prompt,
    /// Completion call.
    Completion,
    /// Memory write.
    Remember,
    /// Auxiliary capability call.
    Auxiliary,
}

impl Stage {
    /// Lowercase label used in logs and notices.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Recall => "recall",
            Self::Prompt => "prompt",
            Self::Completion => "completion",
            Self::Remember => "remember",
            Self::Auxiliary => "auxiliary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a turn or prevent a controller from being built.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Input was rejected before anything happened.
    #[error("invalid input: {reason}")]
    Validation {
        /// Why the input was rejected.
        reason: &'static str,
    },

    /// A collaborator failed.
    #[error("{stage} failed: {reason}")]
    Provider {
        /// Failing step.
        stage: Stage,
        /// Error text from the collaborator.
        reason: String,
        /// Whether another attempt could have succeeded.
        retryable: bool,
    },

    /// A collaborator did not answer within the per-attempt deadline.
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        /// Failing step.
        stage: Stage,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// The instruction template for the chosen intent did not render.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The controller was assembled from mismatched parts.
    #[error("turn controller misconfigured: {reason}")]
    Setup {
        /// Description of the mismatch.
        reason: String,
    },

    /// No session with this id is registered.
    #[error("unknown session {id}")]
    UnknownSession {
        /// Requested id.
        id: SessionId,
    },
}

impl TurnError {
    /// Convenience constructor for setup failures.
    #[must_use]
    pub fn setup(reason: impl Into<String>) -> Self {
        Self::Setup {
            reason: reason.into(),
        }
    }

    /// Wraps a collaborator error for `stage`.
    #[must_use]
    pub fn provider<E: Transient>(stage: Stage, err: &E) -> Self {
        Self::Provider {
            stage,
            reason: err.to_string(),
            retryable: err.is_transient(),
        }
    }

    /// Step the error belongs to, if it came from a collaborator.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Provider { stage, .. } | Self::Timeout { stage, .. } => Some(*stage),
            Self::Prompt(_) => Some(Stage::Prompt),
            _ => None,
        }
    }

    /// Whether the retry policy may try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Result alias for turn operations.
pub type TurnResult<T> = Result<T, TurnError>;

/// Collaborator errors the retry policy understands.
pub trait Transient: fmt::Display {
    /// Whether repeating the call may succeed.
    fn is_transient(&self) -> bool;

    /// Provider-requested delay before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Transient for AdapterError {
    fn is_transient(&self) -> bool {
        AdapterError::is_transient(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        AdapterError::retry_after(self)
    }
}

impl Transient for MemoryError {
    fn is_transient(&self) -> bool {
        MemoryError::is_transient(self)
    }
}
