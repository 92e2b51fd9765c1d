//! Turn controller for recall-chat.
//!
//! This crate owns conversation state and the per-turn protocol: sessions and
//! their append-only transcripts, the registry that serialises turns per
//! session, the retry policy wrapped around every collaborator call, and the
//! [`TurnController`] that ties memory lookup, classification, completion and
//! memory storage together.

#![warn(missing_docs, clippy::pedantic)]

mod auxiliary;
mod error;
mod retry;
mod session;
mod turn;

pub use auxiliary::{AuxiliaryRegistry, Command};
pub use error::{Stage, Transient, TurnError, TurnResult};
pub use retry::RetryPolicy;
pub use session::{ChatSession, SessionHandle, SessionRegistry, Transcript};
pub use turn::{TurnController, TurnOutcome};
