//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("missing required setting `{var}`")]
    Missing {
        /// Variable name.
        var: &'static str,
    },

    /// A variable is set but unusable.
    #[error("invalid value for `{var}`: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The profile file could not be read.
    #[error("failed to read profile {}: {source}", path.display())]
    Io {
        /// Profile path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The profile is not valid TOML or does not match the schema.
    #[error("malformed profile: {source}")]
    Parse {
        /// Underlying error.
        #[from]
        source: toml::de::Error,
    },

    /// The profile parsed but its values are inconsistent.
    #[error("invalid profile: {reason}")]
    Profile {
        /// Description of the problem.
        reason: String,
    },
}

impl ConfigError {
    /// Convenience constructor for profile validation failures.
    #[must_use]
    pub fn profile(reason: impl Into<String>) -> Self {
        Self::Profile {
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
