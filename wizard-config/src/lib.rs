//! Configuration management for the prompt wizard.
//!
//! Settings come from an optional TOML file, then `PROMPT_WIZARD_*`
//! environment variables, and are validated before use.

#![warn(missing_docs, clippy::pedantic)]

use std::path::PathBuf;

use thiserror::Error;

pub mod loader;
pub mod schema;

pub use loader::{ENV_CREDENTIALS, ENV_LOG, ENV_PROVIDER};
pub use schema::{CredentialBackend, CredentialConfig, RetryConfig, SuggestionConfig, SynthesisConfig, WizardConfig};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Source [`std::io::Error`].
        source: std::io::Error,
    },
    /// The document is not valid TOML for the schema.
    #[error("failed to parse configuration{}: {source}", location(.path))]
    Parse {
        /// File being parsed, if any.
        path: Option<PathBuf>,
        /// Source [`toml::de::Error`].
        source: Box<toml::de::Error>,
    },
    /// A value is out of range.
    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Helper to construct validation errors.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
