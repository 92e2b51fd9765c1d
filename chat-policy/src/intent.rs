//! Intent assigned to a user turn on a memory miss.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the turn controller should answer an input it has no memory of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Input touches an ethics trigger; answer with refusal framing.
    Refusal,
    /// Input asks for a prediction or an opinion.
    Opinion,
    /// Everything else.
    General,
}

impl Intent {
    /// Stable label used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refusal => "refusal",
            Self::Opinion => "opinion",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
