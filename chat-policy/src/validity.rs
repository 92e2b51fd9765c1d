//! Admission filter for memory writes.

/// Decides whether a generated reply is worth remembering.
///
/// Trivial replies ("Hello", "Sure.") would otherwise be served back for
/// every nearby query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyFilter {
    min_tokens: usize,
}

impl ReplyFilter {
    /// Accepts replies with at least `min_tokens` whitespace-delimited tokens.
    /// A value below two is raised to two.
    #[must_use]
    pub fn new(min_tokens: usize) -> Self {
        Self {
            min_tokens: min_tokens.max(2),
        }
    }

    /// Minimum number of tokens a stored reply must have.
    #[must_use]
    pub fn min_tokens(self) -> usize {
        self.min_tokens
    }

    /// Whether `reply` may be written to memory.
    #[must_use]
    pub fn admits(self, reply: &str) -> bool {
        reply.split_whitespace().nth(self.min_tokens - 1).is_some()
    }
}

impl Default for ReplyFilter {
    fn default() -> Self {
        Self::new(2)
    }
}
