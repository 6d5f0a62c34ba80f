//! Credential store contract and its in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::CredentialResult;
use crate::record::CredentialRecord;

/// Persistent key-value store of credentials, keyed by provider id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the record stored for `provider_id`, if any.
    async fn get(&self, provider_id: &str) -> CredentialResult<Option<CredentialRecord>>;

    /// Stores `record`, overwriting any previous value for its provider.
    async fn put(&self, record: CredentialRecord) -> CredentialResult<()>;

    /// Removes the record for `provider_id`; returns whether one existed.
    async fn remove(&self, provider_id: &str) -> CredentialResult<bool>;
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, provider_id: &str) -> CredentialResult<Option<CredentialRecord>> {
        Ok(self.records.read().await.get(provider_id).cloned())
    }

    async fn put(&self, record: CredentialRecord) -> CredentialResult<()> {
        self.records
            .write()
            .await
            .insert(record.provider_id().to_owned(), record);
        Ok(())
    }

    async fn remove(&self, provider_id: &str) -> CredentialResult<bool> {
        Ok(self.records.write().await.remove(provider_id).is_some())
    }
}
