//! Store backed by the platform secret service.

use async_trait::async_trait;
use tracing::debug;

use crate::record::CredentialRecord;
use crate::store::CredentialStore;
use crate::{CredentialError, CredentialResult};

/// Keeps one keyring entry per provider under a shared service name.
///
/// The entry's password holds the JSON-encoded record so the expiry travels
/// with the secret.
#[derive(Clone, Debug)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    /// Creates a store using `service` as the keyring service name.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn with_entry<T, F>(&self, provider_id: &str, op: F) -> CredentialResult<T>
    where
        T: Send + 'static,
        F: FnOnce(::keyring::Entry) -> Result<T, ::keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let user = provider_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let entry = ::keyring::Entry::new(&service, &user)?;
            op(entry)
        })
        .await
        .map_err(|err| CredentialError::backend(format!("keyring task failed: {err}")))?
        .map_err(|err| CredentialError::backend(err.to_string()))
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get(&self, provider_id: &str) -> CredentialResult<Option<CredentialRecord>> {
        let stored = self
            .with_entry(provider_id, |entry| match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(::keyring::Error::NoEntry) => Ok(None),
                Err(err) => Err(err),
            })
            .await?;
        stored.as_deref().map(decode).transpose()
    }

    async fn put(&self, record: CredentialRecord) -> CredentialResult<()> {
        let encoded = encode(&record)?;
        self.with_entry(record.provider_id(), move |entry| {
            entry.set_password(&encoded)
        })
        .await?;
        debug!(provider = record.provider_id(), "credential stored in keyring");
        Ok(())
    }

    async fn remove(&self, provider_id: &str) -> CredentialResult<bool> {
        self.with_entry(provider_id, |entry| match entry.delete_password() {
            Ok(()) => Ok(true),
            Err(::keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err),
        })
        .await
    }
}

// The password slot holds the whole record so the expiry survives.
fn encode(record: &CredentialRecord) -> CredentialResult<String> {
    Ok(serde_json::to_string(record)?)
}

fn decode(password: &str) -> CredentialResult<CredentialRecord> {
    Ok(serde_json::from_str(password)?)
}
