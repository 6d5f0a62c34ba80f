//! Persisted credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wizard_primitives::Secret;

use crate::{CredentialError, CredentialResult};

/// One secret scoped to a provider, with an optional expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    provider_id: String,
    secret: Secret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Creates a record without expiry.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidProvider`] when the id is blank.
    pub fn new(provider_id: impl Into<String>, secret: Secret) -> CredentialResult<Self> {
        let provider_id = provider_id.into();
        if provider_id.trim().is_empty() {
            return Err(CredentialError::InvalidProvider(
                "provider id must not be empty",
            ));
        }
        Ok(Self {
            provider_id,
            secret,
            expires_at: None,
        })
    }

    /// Sets the instant after which the secret must no longer be used.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Provider the secret belongs to.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// The stored secret.
    #[must_use]
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Consumes the record, returning the secret.
    #[must_use]
    pub fn into_secret(self) -> Secret {
        self.secret
    }

    /// Expiry instant, if any.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns `true` once `now` has reached the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn rejects_blank_provider() {
        let err = CredentialRecord::new("  ", Secret::new("sk-1")).expect_err("blank id");
        assert!(matches!(err, CredentialError::InvalidProvider(_)));
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let record = CredentialRecord::new("openai", Secret::new("sk-1"))
            .unwrap()
            .with_expiry(now);
        assert!(record.is_expired_at(now));
        assert!(!record.is_expired_at(now - Duration::seconds(1)));

        let forever = CredentialRecord::new("openai", Secret::new("sk-1")).unwrap();
        assert!(!forever.is_expired_at(now + Duration::days(3650)));
    }
}
