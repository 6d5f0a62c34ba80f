//! One wizard run wired from configuration.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use wizard_adapters::{HttpTransport, ProviderRegistry};
use wizard_config::{ConfigError, CredentialBackend, CredentialConfig, WizardConfig};
use wizard_credentials::{
    CredentialError, CredentialResolver, CredentialStore, FileCredentialStore,
    MemoryCredentialStore, ProcessEnv,
};
use wizard_primitives::{SessionId, Secret, Step};
use wizard_prompts::builtin_steps;

use crate::debounce::{ActionKey, DebounceGuard};
use crate::document::Document;
use crate::gateway::{GatewayError, ProviderGateway};
use crate::generation::{Artifact, GenerationClient, GenerationError};
use crate::retry::RetryPolicy;
use crate::scheduler::TaskScheduler;
use crate::sequencer::{SequencerError, StepSequencer, Transition};
use crate::suggestions::{GenerateOutcome, SuggestionEngine, SuggestionSettings};

/// Errors raised while building or driving a [`WizardSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration cannot be applied.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The step catalog is malformed.
    #[error(transparent)]
    Catalog(#[from] wizard_primitives::Error),
    /// The credential store could not be opened.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Provider selection or credential entry failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Navigation or suggestion handling failed.
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    /// Final synthesis failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Sequencer, generation client, and debounce guard for one user session.
///
/// The user-facing operations return `Ok(None)` when the debounce guard
/// suppressed the action.
#[derive(Debug)]
pub struct WizardSession {
    id: SessionId,
    gateway: ProviderGateway,
    sequencer: StepSequencer,
    generation: GenerationClient,
    debounce: DebounceGuard,
    scheduler: TaskScheduler,
}

impl WizardSession {
    /// Builds a session from configuration, the built-in step catalog, and
    /// the built-in provider registry.
    ///
    /// Credentials live in the backend chosen by `credentials.backend`:
    /// memory, the JSON file at `credentials.path`, or the platform keyring.
    /// Each provider's environment variable overrides the stored key.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store cannot be opened or the
    /// configured provider is unknown.
    pub async fn open(
        config: &WizardConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> SessionResult<Self> {
        let registry = ProviderRegistry::builtin();
        let env = registry
            .iter()
            .fold(ProcessEnv::new(), |env, descriptor| {
                env.with_var(descriptor.id(), descriptor.env_var())
            });

        let store = credential_store(&config.credentials).await?;
        let mut resolver = CredentialResolver::new(store).with_override(Arc::new(env));
        if let Some(hours) = config.credentials.ttl_hours {
            let ttl = i64::try_from(hours)
                .ok()
                .and_then(chrono::Duration::try_hours)
                .ok_or_else(|| ConfigError::invalid("credentials.ttl_hours", "out of range"))?;
            resolver = resolver.with_ttl(ttl);
        }

        let gateway = ProviderGateway::new(registry, resolver, transport, &config.provider)?;
        Self::new(config, builtin_steps()?, gateway)
    }

    /// Builds a session over explicit steps and gateway.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Sequencer`] for an empty or duplicated catalog.
    pub fn new(
        config: &WizardConfig,
        steps: Vec<Step>,
        gateway: ProviderGateway,
    ) -> SessionResult<Self> {
        let retry = RetryPolicy::from(&config.retry);
        let scheduler = TaskScheduler::default();
        let engine = SuggestionEngine::new(
            gateway.clone(),
            retry,
            SuggestionSettings::from(&config.suggestions),
        );
        let sequencer = StepSequencer::new(steps, engine, scheduler.clone())?;
        let generation = GenerationClient::new(
            gateway.clone(),
            retry,
            config.synthesis,
            config.generation_cooldown(),
        );
        let id = SessionId::random();
        info!(session = %id, provider = %gateway.active_provider(), "wizard session opened");

        Ok(Self {
            id,
            gateway,
            sequencer,
            generation,
            debounce: DebounceGuard::new(config.debounce()),
            scheduler,
        })
    }

    /// Session identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The step sequencer.
    #[must_use]
    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    /// Mutable access for direct field edits.
    pub fn sequencer_mut(&mut self) -> &mut StepSequencer {
        &mut self.sequencer
    }

    /// Provider access shared by suggestions and synthesis.
    #[must_use]
    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Final synthesis client.
    #[must_use]
    pub fn generation(&self) -> &GenerationClient {
        &self.generation
    }

    /// Debounced [`StepSequencer::advance`].
    ///
    /// # Errors
    ///
    /// Propagates [`SequencerError`].
    pub fn next(&mut self) -> SessionResult<Option<Transition>> {
        if !self.debounce.try_invoke(ActionKey::Next) {
            return Ok(None);
        }
        Ok(Some(self.sequencer.advance()?))
    }

    /// Debounced [`StepSequencer::retreat`].
    pub fn prev(&mut self) -> Option<bool> {
        self.debounce
            .try_invoke(ActionKey::Prev)
            .then(|| self.sequencer.retreat())
    }

    /// Debounced [`StepSequencer::toggle_suggestion`]; returns the new value.
    ///
    /// # Errors
    ///
    /// Propagates [`SequencerError`].
    pub fn toggle(&mut self, index: usize) -> SessionResult<Option<String>> {
        if !self.debounce.try_invoke(ActionKey::Example(index)) {
            return Ok(None);
        }
        Ok(Some(self.sequencer.toggle_suggestion(index)?.to_owned()))
    }

    /// Debounced [`StepSequencer::request_suggestions`].
    ///
    /// # Errors
    ///
    /// Propagates [`SequencerError`].
    pub async fn refresh_suggestions(&mut self) -> SessionResult<Option<GenerateOutcome>> {
        if !self.debounce.try_invoke(ActionKey::Refresh) {
            return Ok(None);
        }
        Ok(Some(self.sequencer.request_suggestions().await?))
    }

    /// Debounced synthesis of `document` with the active provider.
    ///
    /// # Errors
    ///
    /// Propagates [`GenerationError`], including the credential-required and
    /// cooldown outcomes.
    pub async fn synthesize(&mut self, document: &Document) -> SessionResult<Option<Artifact>> {
        if !self.debounce.try_invoke(ActionKey::Generate) {
            return Ok(None);
        }
        let provider = self.gateway.active_provider();
        debug!(session = %self.id, %provider, "synthesis requested");
        Ok(Some(self.generation.synthesize(document, &provider).await?))
    }

    /// Stores `secret` for the active provider after checking its format.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::KeyFormat`] for malformed keys and propagates
    /// store failures.
    pub async fn store_credential(&self, secret: Secret) -> SessionResult<()> {
        let provider = self.gateway.active_provider();
        self.gateway.store_credential(&provider, secret).await?;
        info!(session = %self.id, %provider, "credential stored");
        Ok(())
    }

    /// Stops background prefetches.
    pub fn close(&self) {
        self.scheduler.close();
        info!(session = %self.id, "wizard session closed");
    }
}

/// Service name for keyring entries.
pub const KEYRING_SERVICE: &str = "prompt-wizard";

async fn credential_store(config: &CredentialConfig) -> SessionResult<Arc<dyn CredentialStore>> {
    match config.effective_backend() {
        CredentialBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new())),
        CredentialBackend::File => {
            let path = config.path.clone().ok_or_else(|| {
                ConfigError::invalid("credentials.path", "required by the file backend")
            })?;
            Ok(Arc::new(FileCredentialStore::open(path).await?))
        }
        #[cfg(feature = "keyring")]
        CredentialBackend::Keyring => Ok(Arc::new(
            wizard_credentials::KeyringCredentialStore::new(KEYRING_SERVICE),
        )),
        #[cfg(not(feature = "keyring"))]
        CredentialBackend::Keyring => Err(ConfigError::invalid(
            "credentials.backend",
            "keyring support was not compiled in",
        )
        .into()),
    }
}

