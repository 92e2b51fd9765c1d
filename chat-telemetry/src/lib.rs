//! Observability utilities for recall-chat.

#![warn(missing_docs, clippy::pedantic)]

pub mod observer;
pub mod tracing_support;

pub use observer::{
    CollectingTurnObserver, CompositeTurnObserver, TracingTurnObserver, TurnEvent, TurnKind,
    TurnObserver,
};
pub use tracing_support::{init, TelemetryError, DEFAULT_DIRECTIVE};
