//! System instructions keyed by intent.

use std::collections::HashMap;

use chat_policy::Intent;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PromptError, PromptResult};
use crate::template::PromptTemplate;

/// Name substituted for `{{assistant_name}}` unless configured otherwise.
pub const DEFAULT_ASSISTANT_NAME: &str = "Lach's Bot";

const GENERAL_INSTRUCTION: &str = "You are {{assistant_name}}, a helpful and friendly assistant. \
Answer the user's message clearly and concisely.";

const OPINION_INSTRUCTION: &str = "You are {{assistant_name}}. The user is asking for a prediction \
or an opinion. Give a balanced view, lay out the main considerations on each side, and say plainly \
that the outcome is uncertain and that this is not a statement of fact.";

const REFUSAL_INSTRUCTION: &str = "You are {{assistant_name}}. The user's request touches on \
something that could cause harm or break the law. Politely decline to help with the harmful part, \
briefly explain why, and suggest a safe, legitimate alternative if there is one.";

/// One system instruction per [`Intent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptBook {
    assistant_name: String,
    general: PromptTemplate,
    opinion: PromptTemplate,
    refusal: PromptTemplate,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self {
            assistant_name: DEFAULT_ASSISTANT_NAME.to_owned(),
            general: PromptTemplate::new(GENERAL_INSTRUCTION),
            opinion: PromptTemplate::new(OPINION_INSTRUCTION),
            refusal: PromptTemplate::new(REFUSAL_INSTRUCTION),
        }
    }
}

impl PromptBook {
    /// Overrides the assistant name.
    #[must_use]
    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    /// Replaces the template for `intent`.
    #[must_use]
    pub fn with_template(mut self, intent: Intent, template: PromptTemplate) -> Self {
        *self.slot_mut(intent) = template;
        self
    }

    /// Returns the configured assistant name.
    #[must_use]
    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    /// Returns the raw template for `intent`.
    #[must_use]
    pub fn template(&self, intent: Intent) -> &PromptTemplate {
        match intent {
            Intent::General => &self.general,
            Intent::Opinion => &self.opinion,
            Intent::Refusal => &self.refusal,
        }
    }

    /// Renders the system instruction for `intent`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] when the template references unknown variables
    /// or renders to blank text.
    pub fn instruction(&self, intent: Intent) -> PromptResult<String> {
        let vars = HashMap::from([("assistant_name".to_owned(), self.assistant_name.clone())]);
        let rendered = self.template(intent).render(&vars)?;
        if rendered.trim().is_empty() {
            return Err(PromptError::EmptyInstruction {
                intent: intent.to_string(),
            });
        }
        debug!(%intent, bytes = rendered.len(), "rendered system instruction");
        Ok(rendered)
    }

    /// Renders every instruction once, surfacing template mistakes at startup.
    ///
    /// # Errors
    ///
    /// Returns the first rendering failure.
    pub fn validate(&self) -> PromptResult<()> {
        for intent in [Intent::General, Intent::Opinion, Intent::Refusal] {
            self.instruction(intent)?;
        }
        Ok(())
    }

    fn slot_mut(&mut self, intent: Intent) -> &mut PromptTemplate {
        match intent {
            Intent::General => &mut self.general,
            Intent::Opinion => &mut self.opinion,
            Intent::Refusal => &mut self.refusal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_book_is_valid() {
        PromptBook::default().validate().unwrap();
    }

    #[test]
    fn instructions_differ_per_intent() {
        let book = PromptBook::default();
        let general = book.instruction(Intent::General).unwrap();
        let opinion = book.instruction(Intent::Opinion).unwrap();
        let refusal = book.instruction(Intent::Refusal).unwrap();
        assert_ne!(general, opinion);
        assert_ne!(opinion, refusal);
        assert!(general.starts_with("You are Lach's Bot"));
    }

    #[test]
    fn unknown_variable_fails_validation() {
        let book = PromptBook::default()
            .with_template(Intent::Opinion, PromptTemplate::new("Hi {{user_name}}"));
        assert!(matches!(
            book.validate(),
            Err(PromptError::MissingVariable { .. })
        ));
    }

    #[test]
    fn blank_template_is_rejected() {
        let book = PromptBook::default().with_template(Intent::General, PromptTemplate::new("  "));
        assert!(matches!(
            book.instruction(Intent::General),
            Err(PromptError::EmptyInstruction { .. })
        ));
    }
}
