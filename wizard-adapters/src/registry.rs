//! Static catalog of generation providers and wire-format dispatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wizard_primitives::Secret;

use crate::chat_completions::{ChatCompletionsAdapter, OPENAI_ENDPOINT, OPENROUTER_ENDPOINT};
use crate::completion::{AdapterInfo, CompletionAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::generate_content::{GEMINI_ENDPOINT, GenerateContentAdapter};
use crate::transport::HttpTransport;

/// Request/response shape spoken by a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `{model, messages, temperature, max_tokens}` -> `.choices[0].message.content`.
    ChatCompletions,
    /// `{contents, generationConfig}` -> `.candidates[0].content.parts[0].text`.
    GenerateContent,
}

/// Reason a user-entered key was rejected before being stored.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KeyFormatError {
    /// Nothing was entered.
    #[error("API key is required")]
    Empty,
    /// The key does not start with the provider's prefix.
    #[error("API key must start with `{expected}`")]
    MissingPrefix {
        /// Prefix required by the provider.
        expected: String,
    },
}

/// Immutable description of one provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    id: String,
    display_name: String,
    endpoint: String,
    request_model: String,
    wire: WireFormat,
    key_prefix: String,
    key_placeholder: String,
    key_instructions_url: String,
    env_var: String,
    #[serde(default)]
    extra_headers: Vec<(String, String)>,
}

impl ProviderDescriptor {
    /// Creates a descriptor; key metadata defaults to empty values.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        endpoint: impl Into<String>,
        request_model: impl Into<String>,
        wire: WireFormat,
    ) -> Self {
        let id = id.into();
        let env_var = format!("{}_API_KEY", id.to_ascii_uppercase().replace('-', "_"));
        Self {
            id,
            display_name: display_name.into(),
            endpoint: endpoint.into(),
            request_model: request_model.into(),
            wire,
            key_prefix: String::new(),
            key_placeholder: String::new(),
            key_instructions_url: String::new(),
            env_var,
            extra_headers: Vec::new(),
        }
    }

    /// Sets the key prefix and the placeholder shown in the key dialog.
    #[must_use]
    pub fn with_key_format(
        mut self,
        prefix: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        self.key_prefix = prefix.into();
        self.key_placeholder = placeholder.into();
        self
    }

    /// Sets the page explaining how to obtain a key.
    #[must_use]
    pub fn with_key_instructions(mut self, url: impl Into<String>) -> Self {
        self.key_instructions_url = url.into();
        self
    }

    /// Overrides the environment variable consulted for a key override.
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Adds a header sent with every request to this provider.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the endpoint (e.g. for a self-hosted gateway).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Provider identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Full request URL without credentials.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model identifier sent with requests.
    #[must_use]
    pub fn request_model(&self) -> &str {
        &self.request_model
    }

    /// Wire format used to encode and decode.
    #[must_use]
    pub const fn wire(&self) -> WireFormat {
        self.wire
    }

    /// Required key prefix; empty means any non-empty key.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Placeholder shown in the key input.
    #[must_use]
    pub fn key_placeholder(&self) -> &str {
        &self.key_placeholder
    }

    /// Page explaining how to obtain a key.
    #[must_use]
    pub fn key_instructions_url(&self) -> &str {
        &self.key_instructions_url
    }

    /// Environment variable that overrides stored keys.
    #[must_use]
    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Checks a key entered by the user before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyFormatError`] when the key is blank or lacks the prefix.
    pub fn check_key_format(&self, candidate: &str) -> Result<(), KeyFormatError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(KeyFormatError::Empty);
        }
        if !candidate.starts_with(&self.key_prefix) {
            return Err(KeyFormatError::MissingPrefix {
                expected: self.key_prefix.clone(),
            });
        }
        Ok(())
    }

    /// Builds an adapter for this provider using the supplied key.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when the key is blank or the
    /// endpoint is malformed.
    pub fn connect(
        &self,
        api_key: Secret,
        transport: Arc<dyn HttpTransport>,
    ) -> AdapterResult<Arc<dyn CompletionAdapter>> {
        let info = AdapterInfo::new(&self.id, &self.request_model);
        Ok(match self.wire {
            WireFormat::ChatCompletions => {
                let adapter = ChatCompletionsAdapter::new(info, &self.endpoint, api_key, transport)?;
                Arc::new(
                    self.extra_headers
                        .iter()
                        .fold(adapter, |adapter, (name, value)| adapter.with_header(name, value)),
                )
            }
            WireFormat::GenerateContent => Arc::new(GenerateContentAdapter::new(
                info,
                &self.endpoint,
                api_key,
                transport,
            )?),
        })
    }
}

/// Lookup table of known providers.
#[derive(Clone, Debug)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry containing the built-in providers.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            ProviderDescriptor::new(
                "openrouter",
                "OpenRouter",
                OPENROUTER_ENDPOINT,
                "openai/gpt-4o-mini",
                WireFormat::ChatCompletions,
            )
            .with_key_format("sk-or-", "sk-or-...")
            .with_key_instructions("https://openrouter.ai/keys")
            .with_header("HTTP-Referer", "https://github.com/prompt-wizard/prompt-wizard")
            .with_header("X-Title", "Prompt Wizard"),
        );
        registry.register(
            ProviderDescriptor::new(
                "openai",
                "OpenAI",
                OPENAI_ENDPOINT,
                "gpt-4o-mini",
                WireFormat::ChatCompletions,
            )
            .with_key_format("sk-", "sk-...")
            .with_key_instructions("https://platform.openai.com/api-keys"),
        );
        registry.register(
            ProviderDescriptor::new(
                "gemini",
                "Google Gemini",
                GEMINI_ENDPOINT,
                "gemini-pro",
                WireFormat::GenerateContent,
            )
            .with_key_format("AI", "AI...")
            .with_key_instructions("https://makersuite.google.com/app/apikey"),
        );
        registry
    }

    /// Adds a descriptor, replacing any existing one with the same id.
    pub fn register(&mut self, descriptor: ProviderDescriptor) {
        if let Some(existing) = self
            .providers
            .iter_mut()
            .find(|existing| existing.id == descriptor.id)
        {
            *existing = descriptor;
        } else {
            self.providers.push(descriptor);
        }
    }

    /// Looks up a provider by id.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for unknown ids.
    pub fn get(&self, id: &str) -> AdapterResult<&ProviderDescriptor> {
        self.providers
            .iter()
            .find(|descriptor| descriptor.id == id)
            .ok_or_else(|| AdapterError::configuration(format!("unknown provider `{id}`")))
    }

    /// Iterates providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
