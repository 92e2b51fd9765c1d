//! Error types for the memory subsystem.

use thiserror::Error;

/// Errors emitted by memory components and the providers behind them.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The provided configuration was invalid.
    #[error("invalid memory configuration: {0}")]
    InvalidConfig(&'static str),
    /// The embedding provider rejected the input or returned an unusable vector.
    #[error("embedding provider error: {reason}")]
    Embedding {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// Vector store backend reported an application error.
    #[error("vector store error: {reason}")]
    VectorStore {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// A provider could not be reached, timed out, or asked us to back off.
    #[error("memory provider unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// A vector did not have the dimension the index was created with.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Memory record failed validation.
    #[error("invalid memory record: {0}")]
    InvalidRecord(&'static str),
}

impl MemoryError {
    /// Helper to construct vector store errors from string-like values.
    #[must_use]
    pub fn vector_store(reason: impl Into<String>) -> Self {
        Self::VectorStore {
            reason: reason.into(),
        }
    }

    /// Helper to construct embedding errors from string-like values.
    #[must_use]
    pub fn embedding(reason: impl Into<String>) -> Self {
        Self::Embedding {
            reason: reason.into(),
        }
    }

    /// Helper to construct transient availability errors.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns true when repeating the call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
