//! Validation errors for ids and step descriptors.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias for primitive constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// A primitive value failed validation.
#[derive(Debug, Error)]
pub enum Error {
    /// Session id text is not a UUID.
    #[error("session id is not a uuid: {source}")]
    InvalidSessionId {
        /// Parse failure.
        #[from]
        source: UuidError,
    },

    /// Field id is empty, too long, or not `[a-z0-9._-]` only.
    #[error("field id `{id}` rejected: {reason}")]
    InvalidFieldId {
        /// Rejected text.
        id: String,
        /// What rule it broke.
        reason: String,
    },

    /// Step title missing or out of bounds.
    #[error("step rejected: {reason}")]
    InvalidStep {
        /// What rule it broke.
        reason: String,
    },
}
