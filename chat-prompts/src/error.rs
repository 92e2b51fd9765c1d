use thiserror::Error;

/// Result alias for prompt operations.
pub type PromptResult<T> = Result<T, PromptError>;

/// Errors raised while building prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    /// A placeholder had no value.
    #[error("missing template variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A `{{` was never closed.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening braces.
        offset: usize,
    },

    /// An instruction rendered to nothing.
    #[error("system instruction for `{intent}` is empty")]
    EmptyInstruction {
        /// Intent label the instruction belongs to.
        intent: String,
    },
}
