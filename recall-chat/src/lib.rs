//! recall-chat: a terminal chat assistant with vector memory.
//!
//! Depend on this crate to get the whole pipeline in one place. It re-exports
//! the component crates and adds the wiring that turns a [`ChatConfig`] and a
//! [`PipelineProfile`] into a ready [`TurnController`], plus the line-oriented
//! chat loop used by the `recall-chat` binary.
//!
//! [`ChatConfig`]: config::ChatConfig
//! [`PipelineProfile`]: config::PipelineProfile
//! [`TurnController`]: kernel::TurnController

#![warn(missing_docs, clippy::pedantic)]

mod app;
pub mod repl;

pub use app::{build_controller, AppOptions, SetupError};

/// Re-export shared primitives for convenience.
pub use chat_primitives as primitives;

/// Turn controller, sessions and retries.
pub use chat_kernel as kernel;

/// Completion, embedding, vector store and search adapters.
pub use chat_adapters as adapters;

/// Embeddings, vector stores and the recall protocol.
pub use chat_memory as memory;

/// Intent classification and reply filtering.
pub use chat_policy as policy;

/// Tracing setup and turn observers.
pub use chat_telemetry as telemetry;

/// Instruction templates and history windows.
pub use chat_prompts as prompts;

/// Environment credentials and pipeline profiles.
pub use chat_config as config;
