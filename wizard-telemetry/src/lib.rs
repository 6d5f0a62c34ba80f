//! Tracing initialisation for prompt wizard binaries.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Directive that failed to parse.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialised: {reason}")]
    AlreadyInitialised {
        /// Message from `tracing-subscriber`.
        reason: String,
    },
}

/// Builds the filter: `RUST_LOG` when set, otherwise `default_directive`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if neither source parses.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directive).map_err(|err| TelemetryError::InvalidFilter {
        directive: default_directive.to_owned(),
        reason: err.to_string(),
    })
}

/// Installs a compact fmt subscriber writing to stderr.
///
/// # Errors
///
/// Returns [`TelemetryError`] for a bad directive or when a subscriber is
/// already installed; never panics.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = env_filter(default_directive)?;
    fmt()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialised {
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_reported() {
        // RUST_LOG is not set under the test harness by default.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = env_filter("wizard=loud").expect_err("unparsable");
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let _ = init_tracing("warn");
        let second = init_tracing("warn");
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialised { .. })));
    }
}
