//! Credential storage and resolution for provider API keys.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod file;
pub mod overrides;
pub mod record;
pub mod resolver;
#[cfg(feature = "keyring")]
pub mod secret_service;
pub mod store;

pub use error::{CredentialError, CredentialResult};
pub use file::FileCredentialStore;
pub use overrides::{OverrideSource, ProcessEnv, StaticOverrides};
pub use record::CredentialRecord;
pub use resolver::CredentialResolver;
#[cfg(feature = "keyring")]
pub use secret_service::KeyringCredentialStore;
pub use store::{CredentialStore, MemoryCredentialStore};
