//! Provider selection, credential lookup, and adapter construction.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::info;
use wizard_adapters::{
    AdapterError, CompletionAdapter, HttpTransport, KeyFormatError, ProviderDescriptor,
    ProviderRegistry,
};
use wizard_credentials::{CredentialError, CredentialResolver};
use wizard_primitives::Secret;

/// Errors raised while reaching a provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider id is not registered.
    #[error("unknown provider `{provider}`")]
    UnknownProvider {
        /// Requested provider id.
        provider: String,
    },
    /// A key entered by the user was rejected before storage.
    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),
    /// The credential store failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The adapter could not be built.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Outcome of trying to reach a provider.
pub enum Connection {
    /// A ready adapter.
    Ready(Arc<dyn CompletionAdapter>),
    /// No credential is available; the caller must prompt for one.
    CredentialRequired,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(adapter) => f
                .debug_tuple("Ready")
                .field(&adapter.info().provider())
                .finish(),
            Self::CredentialRequired => f.write_str("CredentialRequired"),
        }
    }
}

/// Shared access to the registry, credentials, and transport.
///
/// Clones share the active provider selection.
#[derive(Clone)]
pub struct ProviderGateway {
    registry: Arc<ProviderRegistry>,
    resolver: CredentialResolver,
    transport: Arc<dyn HttpTransport>,
    active: Arc<RwLock<String>>,
}

impl fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("active", &self.active_provider())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl ProviderGateway {
    /// Creates a gateway with `active` as the selected provider.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownProvider`] if `active` is not registered.
    pub fn new(
        registry: ProviderRegistry,
        resolver: CredentialResolver,
        transport: Arc<dyn HttpTransport>,
        active: &str,
    ) -> GatewayResult<Self> {
        lookup(&registry, active)?;
        Ok(Self {
            registry: Arc::new(registry),
            resolver,
            transport,
            active: Arc::new(RwLock::new(active.to_owned())),
        })
    }

    /// Currently selected provider id.
    #[must_use]
    pub fn active_provider(&self) -> String {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switches the selected provider.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownProvider`] for unregistered ids.
    pub fn select_provider(&self, provider_id: &str) -> GatewayResult<()> {
        lookup(&self.registry, provider_id)?;
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = provider_id.to_owned();
        info!(provider = provider_id, "provider selected");
        Ok(())
    }

    /// Descriptor for `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownProvider`] for unregistered ids.
    pub fn descriptor(&self, provider_id: &str) -> GatewayResult<&ProviderDescriptor> {
        lookup(&self.registry, provider_id)
    }

    /// The provider catalog.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The credential resolver.
    #[must_use]
    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Checks the key format and stores it for `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::KeyFormat`] for malformed keys and propagates
    /// store failures.
    pub async fn store_credential(&self, provider_id: &str, secret: Secret) -> GatewayResult<()> {
        let descriptor = lookup(&self.registry, provider_id)?;
        descriptor.check_key_format(secret.expose())?;
        let trimmed = Secret::new(secret.expose().trim());
        self.resolver.store(provider_id, trimmed).await?;
        Ok(())
    }

    /// Resolves a credential and builds an adapter for `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for unknown providers, store failures, or
    /// adapter configuration problems.
    pub async fn connect(&self, provider_id: &str) -> GatewayResult<Connection> {
        let descriptor = lookup(&self.registry, provider_id)?;
        let Some(secret) = self.resolver.resolve(provider_id).await? else {
            return Ok(Connection::CredentialRequired);
        };
        let adapter = descriptor.connect(secret, Arc::clone(&self.transport))?;
        Ok(Connection::Ready(adapter))
    }
}

fn lookup<'a>(registry: &'a ProviderRegistry, provider_id: &str) -> GatewayResult<&'a ProviderDescriptor> {
    registry
        .get(provider_id)
        .map_err(|_| GatewayError::UnknownProvider {
            provider: provider_id.to_owned(),
        })
}
