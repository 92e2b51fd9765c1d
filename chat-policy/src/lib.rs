//! Intent classification and memory admission rules.
//!
//! Classification is deliberately dumb: ordered keyword rules, first match
//! wins. It is a pure function of the input text so the same question is
//! always routed the same way.

#![warn(missing_docs, clippy::pedantic)]

pub mod classifier;
pub mod intent;
pub mod rules;
pub mod validity;

pub use classifier::{IntentClassifier, PolicyError, PolicyResult};
pub use intent::Intent;
pub use rules::{KeywordRule, DEFAULT_ETHICS_KEYWORDS, DEFAULT_OPINION_KEYWORDS};
pub use validity::ReplyFilter;
