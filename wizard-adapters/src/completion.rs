//! Provider-neutral completion request and the adapter seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};

/// Who authored a [`Turn`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Steering instructions.
    System,
    /// The person asking.
    User,
    /// Earlier model output.
    Assistant,
}

impl Speaker {
    /// Chat-completion role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    /// Creates a turn.
    #[must_use]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// A user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    /// Author of the turn.
    #[must_use]
    pub const fn speaker(&self) -> Speaker {
        self.speaker
    }

    /// Turn text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Everything a provider needs to produce one completion.
///
/// The wizard sends a single user turn per request; longer conversations are
/// accepted so codecs can be exercised with system and assistant turns too.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    turns: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl CompletionRequest {
    /// Creates a request from a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] when `turns` is empty.
    pub fn new(turns: Vec<Turn>) -> AdapterResult<Self> {
        if turns.is_empty() {
            return Err(AdapterError::invalid_request("a completion needs at least one turn"));
        }
        Ok(Self {
            system: None,
            turns,
            max_tokens: None,
            temperature: None,
        })
    }

    /// Single user prompt, the shape every wizard request takes.
    #[must_use]
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            turns: vec![Turn::user(prompt)],
            max_tokens: None,
            temperature: None,
        }
    }

    /// Adds steering instructions.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Caps the length of the completion.
    #[must_use]
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Steering instructions, if any.
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// Conversation turns in order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Token cap, if any.
    #[must_use]
    pub const fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// Sampling temperature, if any.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// Identifies which provider and model an adapter talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterInfo {
    provider: String,
    model: String,
}

impl AdapterInfo {
    /// Creates the descriptor.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Registry id, for example `openrouter`.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Model name sent on the wire.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// A provider codec bound to a credential and a transport.
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    /// Provider and model this adapter targets.
    fn info(&self) -> &AdapterInfo;

    /// Sends `request` and returns the completion text.
    async fn complete(&self, request: CompletionRequest) -> AdapterResult<String>;
}
