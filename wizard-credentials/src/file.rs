//! JSON-file credential store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::CredentialResult;
use crate::record::CredentialRecord;
use crate::store::CredentialStore;

type Records = BTreeMap<String, CredentialRecord>;

/// Store persisting every record in a single JSON object keyed by provider id.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// original, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Opens (or prepares) a store at the provided path.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors raised while creating the parent directory.
    pub async fn open(path: impl Into<PathBuf>) -> CredentialResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Returns the underlying path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CredentialResult<Records> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Records::new()),
            Err(err) => return Err(err.into()),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Records::new());
        }
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save(&self, records: &Records) -> CredentialResult<()> {
        let bytes = serde_json::to_vec_pretty(records)?;
        let staging = self.path.with_extension("tmp");
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), entries = records.len(), "credential store written");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, provider_id: &str) -> CredentialResult<Option<CredentialRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(provider_id))
    }

    async fn put(&self, record: CredentialRecord) -> CredentialResult<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(record.provider_id().to_owned(), record);
        self.save(&records).await
    }

    async fn remove(&self, provider_id: &str) -> CredentialResult<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(provider_id).is_none() {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }
}
