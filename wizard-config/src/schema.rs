//! Strongly typed configuration schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Top-level wizard configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Provider id used for suggestions and synthesis.
    pub provider: String,
    /// Per-action debounce window in milliseconds.
    pub debounce_ms: u64,
    /// Seconds a successful synthesis blocks the next one.
    pub generation_cooldown_secs: u64,
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,
    /// Retry budget shared by suggestions and synthesis.
    pub retry: RetryConfig,
    /// Suggestion request tuning.
    pub suggestions: SuggestionConfig,
    /// Final synthesis tuning.
    pub synthesis: SynthesisConfig,
    /// Credential persistence.
    pub credentials: CredentialConfig,
    /// Default `tracing` filter directive.
    pub log_filter: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_owned(),
            debounce_ms: 500,
            generation_cooldown_secs: 180,
            http_timeout_secs: 60,
            retry: RetryConfig::default(),
            suggestions: SuggestionConfig::default(),
            synthesis: SynthesisConfig::default(),
            credentials: CredentialConfig::default(),
            log_filter: "info".to_owned(),
        }
    }
}

impl WizardConfig {
    /// Debounce window as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Synthesis cooldown as a [`Duration`].
    #[must_use]
    pub const fn generation_cooldown(&self) -> Duration {
        Duration::from_secs(self.generation_cooldown_secs)
    }

    /// HTTP timeout as a [`Duration`].
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Rejects values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::invalid("provider", "must not be empty"));
        }
        if self.suggestions.count == 0 {
            return Err(ConfigError::invalid("suggestions.count", "must be at least 1"));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::invalid("http_timeout_secs", "must be at least 1"));
        }
        for (key, temperature) in [
            ("suggestions.temperature", self.suggestions.temperature),
            ("synthesis.temperature", self.synthesis.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::invalid(key, "must be between 0.0 and 2.0"));
            }
        }
        if self.credentials.ttl_hours == Some(0) {
            return Err(ConfigError::invalid("credentials.ttl_hours", "must be at least 1"));
        }
        if self.credentials.backend == Some(CredentialBackend::File) && self.credentials.path.is_none() {
            return Err(ConfigError::invalid("credentials.path", "required by the file backend"));
        }
        Ok(())
    }
}

/// Bounded retry settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Inter-attempt delay as a [`Duration`].
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Suggestion request settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Number of numbered lines requested per field.
    pub count: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_tokens: u32,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            count: 5,
            temperature: 0.9,
            max_tokens: 1024,
        }
    }
}

/// Final synthesis settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_tokens: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// Where stored API keys live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// Process memory; lost on exit.
    Memory,
    /// JSON file at `credentials.path`.
    File,
    /// Platform secret service. Needs the `keyring` feature.
    Keyring,
}

/// Where and how long credentials are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Explicit backend. Unset means `file` when `path` is given, else `memory`.
    pub backend: Option<CredentialBackend>,
    /// JSON store path for the file backend.
    pub path: Option<PathBuf>,
    /// Expiry applied to newly stored secrets.
    pub ttl_hours: Option<u64>,
}

impl CredentialConfig {
    /// Backend actually used.
    #[must_use]
    pub fn effective_backend(&self) -> CredentialBackend {
        match (self.backend, &self.path) {
            (Some(backend), _) => backend,
            (None, Some(_)) => CredentialBackend::File,
            (None, None) => CredentialBackend::Memory,
        }
    }
}
