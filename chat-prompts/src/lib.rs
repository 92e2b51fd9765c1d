//! Prompt assembly for recall-chat.
//!
//! Each [`Intent`](chat_policy::Intent) owns one system instruction; the
//! instructions differ only in wording, so they live in a [`PromptBook`]
//! that can be loaded from configuration.

#![warn(missing_docs, clippy::pedantic)]

mod error;

pub mod book;
pub mod history;
pub mod template;

pub use book::{PromptBook, DEFAULT_ASSISTANT_NAME};
pub use error::{PromptError, PromptResult};
pub use history::HistoryWindow;
pub use template::PromptTemplate;
