//! Shared error definitions for chat primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used by primitive parsing helpers.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided session identifier could not be parsed.
    #[error("invalid session id: {source}")]
    InvalidSessionId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A message role label was not one of `user`, `assistant`, or `system`.
    #[error("unknown message role `{0}`")]
    UnknownRole(String),
}
