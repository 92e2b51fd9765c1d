//! Selection of prior conversation turns forwarded to the model.

use chat_primitives::{ChatMessage, MessageRole};
use serde::{Deserialize, Serialize};

/// How many earlier messages accompany the current input.
///
/// Only user and assistant messages are eligible; system entries in a
/// transcript are runtime notices, not conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryWindow {
    max_messages: usize,
}

impl HistoryWindow {
    /// Forwards at most `max_messages` earlier messages. Zero disables history.
    #[must_use]
    pub const fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    /// Returns the configured size.
    #[must_use]
    pub const fn max_messages(self) -> usize {
        self.max_messages
    }

    /// Assembles `[system, ...recent history, user input]`.
    #[must_use]
    pub fn assemble(
        self,
        instruction: &str,
        prior: &[ChatMessage],
        input: &str,
    ) -> Vec<ChatMessage> {
        let eligible: Vec<&ChatMessage> = prior
            .iter()
            .filter(|message| message.role() != MessageRole::System)
            .collect();
        let skip = eligible.len().saturating_sub(self.max_messages);

        let mut messages = Vec::with_capacity(2 + eligible.len() - skip);
        messages.push(ChatMessage::system(instruction));
        messages.extend(eligible.into_iter().skip(skip).cloned());
        messages.push(ChatMessage::user(input));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("reply one"),
            ChatMessage::system("memory provider unavailable"),
            ChatMessage::user("two"),
            ChatMessage::assistant("reply two"),
        ]
    }

    #[test]
    fn zero_window_sends_instruction_and_input_only() {
        let messages = HistoryWindow::default().assemble("be nice", &transcript(), "three");
        assert_eq!(
            messages,
            vec![ChatMessage::system("be nice"), ChatMessage::user("three")]
        );
    }

    #[test]
    fn window_keeps_most_recent_conversation() {
        let messages = HistoryWindow::new(2).assemble("be nice", &transcript(), "three");
        let contents: Vec<&str> = messages.iter().map(ChatMessage::content).collect();
        assert_eq!(contents, ["be nice", "two", "reply two", "three"]);
    }

    #[test]
    fn runtime_notices_are_never_forwarded() {
        let messages = HistoryWindow::new(100).assemble("sys", &transcript(), "three");
        assert_eq!(messages.len(), 6);
        assert!(messages[1..].iter().all(|m| m.role() != MessageRole::System));
    }
}
