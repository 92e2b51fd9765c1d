//! Structured tracing helpers.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when neither a directive nor `RUST_LOG` is given.
pub const DEFAULT_DIRECTIVE: &str = "warn,recall_chat=info,chat_kernel=info";

/// Subscriber installation failures.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Directive as supplied.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already set.
    #[error("tracing subscriber already initialised: {reason}")]
    AlreadyInitialised {
        /// Underlying message.
        reason: String,
    },
}

/// Installs the global `fmt` subscriber.
///
/// `directive` wins over `RUST_LOG`, which wins over [`DEFAULT_DIRECTIVE`].
/// Logs go to stderr so they never interleave with chat output on stdout.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the directive is malformed or a subscriber
/// was already installed.
pub fn init(directive: Option<&str>) -> Result<(), TelemetryError> {
    let filter = build_filter(directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialised {
            reason: err.to_string(),
        })
}

fn build_filter(directive: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    let parse = |directive: &str| {
        EnvFilter::try_new(directive).map_err(|err| TelemetryError::InvalidFilter {
            directive: directive.to_owned(),
            reason: err.to_string(),
        })
    };
    match directive {
        Some(directive) => parse(directive),
        None => EnvFilter::try_from_default_env().or_else(|_| parse(DEFAULT_DIRECTIVE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directive_is_parsed() {
        let filter = build_filter(Some("debug,hyper=warn")).unwrap();
        assert!(filter.to_string().contains("hyper=warn"));
    }

    #[test]
    fn malformed_directive_is_reported() {
        let err = build_filter(Some("chat_kernel=loud")).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn default_directive_is_valid() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
    }
}
