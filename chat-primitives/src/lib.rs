//! Core shared types for recall-chat.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod message;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Unique identifier for a chat session.
pub use ids::SessionId;
/// Role-tagged chat messages.
pub use message::{ChatMessage, MessageRole};
