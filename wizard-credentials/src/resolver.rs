//! Priority-ordered credential resolution.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use wizard_primitives::Secret;

use crate::CredentialResult;
use crate::overrides::OverrideSource;
use crate::record::CredentialRecord;
use crate::store::CredentialStore;

/// Resolves the secret to use for a provider.
///
/// Order: the first non-blank override, then the stored record unless it has
/// expired (in which case it is purged), otherwise nothing.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    overrides: Vec<Arc<dyn OverrideSource>>,
    ttl: Option<Duration>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("overrides", &self.overrides.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialResolver {
    /// Creates a resolver over `store` with no overrides and no expiry.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            overrides: Vec::new(),
            ttl: None,
        }
    }

    /// Adds an override source, consulted in registration order.
    #[must_use]
    pub fn with_override(mut self, source: Arc<dyn OverrideSource>) -> Self {
        self.overrides.push(source);
        self
    }

    /// Applies an expiry of `ttl` to secrets saved through [`Self::store`].
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns a usable secret for `provider_id`, or `None`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn resolve(&self, provider_id: &str) -> CredentialResult<Option<Secret>> {
        self.resolve_at(provider_id, Utc::now()).await
    }

    /// Same as [`Self::resolve`], evaluating expiry against `now`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn resolve_at(
        &self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> CredentialResult<Option<Secret>> {
        if let Some(secret) = self
            .overrides
            .iter()
            .filter_map(|source| source.lookup(provider_id))
            .find(|secret| !secret.is_blank())
        {
            debug!(provider = provider_id, "credential resolved from override");
            return Ok(Some(secret));
        }

        let Some(record) = self.store.get(provider_id).await? else {
            return Ok(None);
        };
        if record.is_expired_at(now) {
            self.store.remove(provider_id).await?;
            info!(provider = provider_id, "stored credential expired and was purged");
            return Ok(None);
        }
        if record.secret().is_blank() {
            return Ok(None);
        }
        Ok(Some(record.into_secret()))
    }

    /// Persists `secret` for `provider_id`, overwriting any prior value.
    ///
    /// The configured TTL, if any, sets the expiry.
    ///
    /// # Errors
    ///
    /// Propagates store failures and rejects blank provider ids.
    pub async fn store(&self, provider_id: &str, secret: Secret) -> CredentialResult<()> {
        let mut record = CredentialRecord::new(provider_id, secret)?;
        if let Some(ttl) = self.ttl {
            record = record.with_expiry(Utc::now() + ttl);
        }
        self.store.put(record).await?;
        debug!(provider = provider_id, "credential stored");
        Ok(())
    }

    /// Persists `secret` with an explicit expiry.
    ///
    /// # Errors
    ///
    /// Propagates store failures and rejects blank provider ids.
    pub async fn store_with_expiry(
        &self,
        provider_id: &str,
        secret: Secret,
        expires_at: DateTime<Utc>,
    ) -> CredentialResult<()> {
        let record = CredentialRecord::new(provider_id, secret)?.with_expiry(expires_at);
        self.store.put(record).await
    }

    /// Removes the stored secret; overrides are unaffected.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn forget(&self, provider_id: &str) -> CredentialResult<bool> {
        self.store.remove(provider_id).await
    }
}
