//! Failures while storing or resolving API keys.

use serde_json::Error as SerdeError;
use thiserror::Error;

/// Why a credential could not be stored or looked up.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Blank provider id.
    #[error("credential needs a provider id: {0}")]
    InvalidProvider(&'static str),
    /// Store file could not be read or replaced.
    #[error("credential file i/o failed: {source}")]
    Io {
        /// Underlying error.
        #[from]
        source: std::io::Error,
    },
    /// Store file is not the expected JSON map.
    #[error("credential file is malformed: {source}")]
    Serialization {
        /// Underlying error.
        #[from]
        source: SerdeError,
    },
    /// OS keyring refused the operation.
    #[error("keyring error: {reason}")]
    Backend {
        /// Message from the keyring backend.
        reason: String,
    },
}

impl CredentialError {
    /// Builds [`CredentialError::Backend`].
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result alias for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;
