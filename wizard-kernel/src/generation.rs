//! Final synthesis of the assembled document.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};
use wizard_adapters::{AdapterError, CompletionRequest};
use wizard_config::SynthesisConfig;
use wizard_prompts::{TemplateError, synthesis_instruction};

use crate::document::Document;
use crate::gateway::{Connection, GatewayError, ProviderGateway};
use crate::retry::RetryPolicy;

/// Errors raised by [`GenerationClient::synthesize`].
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No credential is available; store one and call again.
    #[error("an API key for `{provider}` is required")]
    CredentialRequired {
        /// Provider needing a key.
        provider: String,
    },
    /// A previous synthesis finished too recently.
    #[error("please wait {}s before generating again", .remaining.as_secs().max(1))]
    CoolingDown {
        /// Time left before another attempt is accepted.
        remaining: Duration,
    },
    /// Every attempt failed.
    #[error("generation failed after {attempts} attempt(s): {source}")]
    Failed {
        /// Attempts made.
        attempts: u32,
        /// Last provider error.
        source: AdapterError,
    },
    /// The provider could not be reached for a non-transient reason.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The synthesis instruction failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Result alias for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Local rate limit between successful syntheses.
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    window: Duration,
    last_success: Option<Instant>,
}

impl Cooldown {
    /// Creates an unarmed cooldown with the supplied window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_success: None,
        }
    }

    /// Time left before the next attempt is accepted, if any.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let last = self.last_success?;
        self.window
            .checked_sub(last.elapsed())
            .filter(|left| !left.is_zero())
    }

    /// Starts the window now.
    pub fn arm(&mut self) {
        self.last_success = Some(Instant::now());
    }
}

/// Section of a synthesized artifact, split on `## ` headings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactSection {
    /// Heading text without the `## ` marker; empty for a preamble.
    pub heading: String,
    /// Text under the heading.
    pub body: String,
}

/// The synthesized prompt and where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Artifact {
    text: String,
    provider: String,
    generated_at: DateTime<Utc>,
    document: Document,
}

impl Artifact {
    /// Generated prompt text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Provider that produced it.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// When it was produced.
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Document it was generated from.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Splits the text into `## ` headed sections.
    #[must_use]
    pub fn sections(&self) -> Vec<ArtifactSection> {
        let mut sections = Vec::new();
        let mut current = ArtifactSection {
            heading: String::new(),
            body: String::new(),
        };
        for line in self.text.lines() {
            if let Some(heading) = line.trim_start().strip_prefix("## ") {
                if !current.heading.is_empty() || !current.body.trim().is_empty() {
                    sections.push(finish(current));
                }
                current = ArtifactSection {
                    heading: heading.trim().to_owned(),
                    body: String::new(),
                };
            } else {
                current.body.push_str(line);
                current.body.push('\n');
            }
        }
        if !current.heading.is_empty() || !current.body.trim().is_empty() {
            sections.push(finish(current));
        }
        sections
    }
}

fn finish(mut section: ArtifactSection) -> ArtifactSection {
    section.body = section.body.trim().to_owned();
    section
}

/// Sends assembled documents to a provider for the final prompt.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    gateway: ProviderGateway,
    retry: RetryPolicy,
    settings: SynthesisConfig,
    cooldown: Arc<Mutex<Cooldown>>,
}

impl GenerationClient {
    /// Creates a client; `cooldown` is the window after each success.
    #[must_use]
    pub fn new(
        gateway: ProviderGateway,
        retry: RetryPolicy,
        settings: SynthesisConfig,
        cooldown: Duration,
    ) -> Self {
        Self {
            gateway,
            retry,
            settings,
            cooldown: Arc::new(Mutex::new(Cooldown::new(cooldown))),
        }
    }

    /// Time left before another synthesis is accepted.
    #[must_use]
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.cooldown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining()
    }

    /// Produces the final artifact for `document` using `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::CoolingDown`] before any network call when
    /// the last success is too recent, [`GenerationError::CredentialRequired`]
    /// when no key is available, and [`GenerationError::Failed`] once the
    /// retry budget is spent.
    pub async fn synthesize(
        &self,
        document: &Document,
        provider_id: &str,
    ) -> GenerationResult<Artifact> {
        if let Some(remaining) = self.cooldown_remaining() {
            return Err(GenerationError::CoolingDown { remaining });
        }

        let adapter = match self.gateway.connect(provider_id).await? {
            Connection::Ready(adapter) => adapter,
            Connection::CredentialRequired => {
                return Err(GenerationError::CredentialRequired {
                    provider: provider_id.to_owned(),
                });
            }
        };

        let instruction = synthesis_instruction(&document.render())?;
        let request = CompletionRequest::from_prompt(instruction)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let mut attempts = 0;
        let outcome = self
            .retry
            .run("synthesis", |attempt| {
                attempts = attempt + 1;
                let adapter = Arc::clone(&adapter);
                let request = request.clone();
                async move { adapter.complete(request).await }
            })
            .await;
        let text = outcome.map_err(|source| {
            warn!(provider = provider_id, attempts, error = %source, "synthesis failed");
            GenerationError::Failed { attempts, source }
        })?;

        self.cooldown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .arm();
        info!(provider = provider_id, chars = text.len(), "prompt synthesized");

        Ok(Artifact {
            text,
            provider: provider_id.to_owned(),
            generated_at: Utc::now(),
            document: document.clone(),
        })
    }
}
