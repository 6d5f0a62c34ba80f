use std::time::Duration;

use thiserror::Error;

/// Result alias used across the adapter crate.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failure talking to a completion provider.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Bad endpoint, blank key, or other setup problem.
    #[error("provider setup error: {reason}")]
    Configuration {
        /// What is wrong with the setup.
        reason: String,
    },

    /// The request could not be encoded for the provider's wire format.
    #[error("cannot build completion request: {reason}")]
    InvalidRequest {
        /// Why encoding failed.
        reason: String,
    },

    /// Connect, TLS, or timeout failure.
    #[error("network error: {reason}")]
    Transport {
        /// Underlying transport message.
        reason: String,
    },

    /// HTTP 429.
    #[error("provider is rate limiting requests (retry after {retry_after:?})")]
    RateLimited {
        /// Value of `Retry-After`, when the provider sent one.
        retry_after: Option<Duration>,
    },

    /// Any other non-2xx answer.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// A 2xx body without the expected text.
    #[error("unusable provider response: {reason}")]
    Response {
        /// What was missing or malformed.
        reason: String,
    },
}

impl AdapterError {
    /// Builds [`AdapterError::Configuration`].
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Builds [`AdapterError::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Builds [`AdapterError::Transport`].
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Builds [`AdapterError::Response`].
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }

    /// Whether sending the same request again could succeed.
    ///
    /// Setup and encoding errors are deterministic; everything that came back
    /// from the network may be a passing outage.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::Configuration { .. } | Self::InvalidRequest { .. }
        )
    }
}
