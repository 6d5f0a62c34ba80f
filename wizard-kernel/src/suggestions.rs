//! Suggestion generation, parsing, and selection toggling.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use wizard_adapters::CompletionRequest;
use wizard_config::SuggestionConfig;
use wizard_primitives::{FieldId, SelectionPolicy};
use wizard_prompts::{SuggestionBrief, SuggestionContext, TemplateError};

use crate::gateway::{Connection, GatewayError, ProviderGateway};
use crate::retry::{RetryPolicy, require_lines};

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("ordinal pattern is valid"));

/// Splits provider text into suggestion lines.
///
/// Each line loses a leading `<digits>.` marker and surrounding whitespace;
/// blank lines are dropped.
#[must_use]
pub fn parse_suggestions(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| ORDINAL.replace(line.trim(), "").trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

/// One candidate snippet and whether it has been applied to its field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuggestionItem {
    text: String,
    selected: bool,
}

impl SuggestionItem {
    fn unselected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selected: false,
        }
    }

    /// Snippet text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the snippet is currently applied to the field.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }
}

/// What a call to [`SuggestionEngine::generate`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Provider items replaced the list.
    Generated {
        /// Number of parsed items.
        count: usize,
    },
    /// The provider failed after every retry; the built-in set was used.
    Fallback {
        /// Message suitable for a non-fatal notification.
        notice: String,
    },
    /// A generation for the field was already running; nothing was done.
    Skipped,
    /// No credential is stored for the active provider.
    CredentialRequired {
        /// Provider needing a key.
        provider: String,
    },
    /// The field was invalidated while the request was in flight; the
    /// result was discarded.
    Stale,
}

/// Errors raised by the suggestion engine.
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// The provider could not be reached for a non-transient reason.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The instruction template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// The requested item does not exist.
    #[error("no suggestion at index {index} for field {field}")]
    NoSuchItem {
        /// Field the toggle targeted.
        field: FieldId,
        /// Requested index.
        index: usize,
    },
}

/// Result alias for suggestion operations.
pub type SuggestionResult<T> = Result<T, SuggestionError>;

/// Sampling settings for suggestion requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuggestionSettings {
    /// Lines requested per field.
    pub count: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token budget.
    pub max_tokens: u32,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self::from(&SuggestionConfig::default())
    }
}

impl From<&SuggestionConfig> for SuggestionSettings {
    fn from(config: &SuggestionConfig) -> Self {
        Self {
            count: config.count,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Default)]
struct FieldState {
    items: Vec<SuggestionItem>,
    in_progress: bool,
    token: u64,
}

struct EngineInner {
    gateway: ProviderGateway,
    retry: RetryPolicy,
    settings: SuggestionSettings,
    fields: Mutex<HashMap<FieldId, FieldState>>,
}

/// Per-field suggestion lists with in-flight and staleness tracking.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SuggestionEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("retry", &self.inner.retry)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

// Clears the in-progress flag on every exit path of `generate`.
struct InProgress {
    inner: Arc<EngineInner>,
    field: FieldId,
}

impl Drop for InProgress {
    fn drop(&mut self) {
        if let Some(state) = lock(&self.inner.fields).get_mut(&self.field) {
            state.in_progress = false;
        }
    }
}

impl SuggestionEngine {
    /// Creates an engine that reaches providers through `gateway`.
    #[must_use]
    pub fn new(gateway: ProviderGateway, retry: RetryPolicy, settings: SuggestionSettings) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                gateway,
                retry,
                settings,
                fields: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Gateway used for provider access.
    #[must_use]
    pub fn gateway(&self) -> &ProviderGateway {
        &self.inner.gateway
    }

    /// Requests fresh suggestions for `field` from the active provider.
    ///
    /// A second call for the same field while one is running returns
    /// [`GenerateOutcome::Skipped`] without touching any state.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestionError`] for unknown providers, credential store
    /// failures, or a broken instruction template. Provider failures fall
    /// back to the built-in set instead.
    pub async fn generate(
        &self,
        field: &FieldId,
        context: &SuggestionContext,
    ) -> SuggestionResult<GenerateOutcome> {
        let Some((token, _flag)) = self.begin(field) else {
            debug!(%field, "suggestion generation already running");
            return Ok(GenerateOutcome::Skipped);
        };

        let provider = self.inner.gateway.active_provider();
        let adapter = match self.inner.gateway.connect(&provider).await? {
            Connection::Ready(adapter) => adapter,
            Connection::CredentialRequired => {
                info!(%field, %provider, "suggestions need a credential");
                return Ok(GenerateOutcome::CredentialRequired { provider });
            }
        };

        let brief = SuggestionBrief::for_field(field.as_str());
        let settings = self.inner.settings;
        let instruction = brief.instruction(settings.count, context)?;
        let request = CompletionRequest::from_prompt(instruction)
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens);

        let fetched = self
            .inner
            .retry
            .run("suggestions", |attempt| {
                let adapter = Arc::clone(&adapter);
                let request = request.clone();
                async move {
                    debug!(attempt, "requesting suggestions");
                    let text = adapter.complete(request).await?;
                    require_lines(parse_suggestions(&text))
                }
            })
            .await;

        let (lines, outcome) = match fetched {
            Ok(lines) => {
                let count = lines.len();
                (lines, GenerateOutcome::Generated { count })
            }
            Err(err) => {
                warn!(%field, %provider, error = %err, "suggestions unavailable; using defaults");
                let defaults = brief.defaults().iter().map(|s| (*s).to_owned()).collect();
                let notice = format!("Suggestions are unavailable right now ({err}); showing examples instead.");
                (defaults, GenerateOutcome::Fallback { notice })
            }
        };

        if self.apply(field, token, lines) {
            Ok(outcome)
        } else {
            debug!(%field, token, "discarding stale suggestions");
            Ok(GenerateOutcome::Stale)
        }
    }

    /// Flips the item at `index` and returns the field's new value.
    ///
    /// Selecting appends the item's text as a trailing line; deselecting
    /// removes the first line equal to it after trimming. Under
    /// [`SelectionPolicy::Exclusive`] every other selected item is
    /// deselected first.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestionError::NoSuchItem`] for an out-of-range index.
    pub fn toggle(
        &self,
        field: &FieldId,
        index: usize,
        value: &str,
        policy: SelectionPolicy,
    ) -> SuggestionResult<String> {
        let mut fields = lock(&self.inner.fields);
        let missing = || SuggestionError::NoSuchItem {
            field: field.clone(),
            index,
        };
        let items = &mut fields.get_mut(field).ok_or_else(missing)?.items;
        let target = items.get(index).ok_or_else(missing)?;

        let mut value = value.to_owned();
        if target.selected {
            value = remove_line(&value, &target.text);
            items[index].selected = false;
        } else {
            if policy == SelectionPolicy::Exclusive {
                for (i, other) in items.iter_mut().enumerate() {
                    if i != index && other.selected {
                        value = remove_line(&value, &other.text);
                        other.selected = false;
                    }
                }
            }
            value = append_line(&value, &items[index].text);
            items[index].selected = true;
        }
        Ok(value)
    }

    /// Current items for `field`.
    #[must_use]
    pub fn items(&self, field: &FieldId) -> Vec<SuggestionItem> {
        lock(&self.inner.fields)
            .get(field)
            .map(|state| state.items.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if `field` has a suggestion list.
    #[must_use]
    pub fn has_suggestions(&self, field: &FieldId) -> bool {
        lock(&self.inner.fields)
            .get(field)
            .is_some_and(|state| !state.items.is_empty())
    }

    /// Returns `true` while a generation for `field` is running.
    #[must_use]
    pub fn is_in_progress(&self, field: &FieldId) -> bool {
        lock(&self.inner.fields)
            .get(field)
            .is_some_and(|state| state.in_progress)
    }

    /// Makes any in-flight result for `field` stale.
    pub fn invalidate(&self, field: &FieldId) {
        let mut fields = lock(&self.inner.fields);
        let state = fields.entry(field.clone()).or_default();
        state.token += 1;
    }

    /// Drops every list and invalidates in-flight results.
    pub fn reset(&self) {
        for state in lock(&self.inner.fields).values_mut() {
            state.items.clear();
            state.token += 1;
        }
    }

    fn begin(&self, field: &FieldId) -> Option<(u64, InProgress)> {
        let mut fields = lock(&self.inner.fields);
        let state = fields.entry(field.clone()).or_default();
        if state.in_progress {
            return None;
        }
        state.in_progress = true;
        state.token += 1;
        Some((
            state.token,
            InProgress {
                inner: Arc::clone(&self.inner),
                field: field.clone(),
            },
        ))
    }

    fn apply(&self, field: &FieldId, token: u64, lines: Vec<String>) -> bool {
        let mut fields = lock(&self.inner.fields);
        let Some(state) = fields.get_mut(field).filter(|state| state.token == token) else {
            return false;
        };
        state.items = lines.into_iter().map(SuggestionItem::unselected).collect();
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn append_line(value: &str, line: &str) -> String {
    if value.is_empty() {
        line.to_owned()
    } else {
        format!("{value}\n{line}")
    }
}

fn remove_line(value: &str, line: &str) -> String {
    let target = line.trim();
    let mut removed = false;
    value
        .split('\n')
        .filter(|candidate| {
            if !removed && candidate.trim() == target {
                removed = true;
                false
            } else {
                true
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_lines() {
        assert_eq!(
            parse_suggestions("1. Idea one\n2. Idea two\n\n3. Idea three"),
            ["Idea one", "Idea two", "Idea three"]
        );
        assert_eq!(parse_suggestions("  10.Tight\r\n- kept as is "), ["Tight", "- kept as is"]);
        assert!(parse_suggestions("\n  \n1. \n").is_empty());
    }

    #[test]
    fn remove_first_matching_line_only() {
        assert_eq!(remove_line("Idea one\nIdea two", "Idea one"), "Idea two");
        assert_eq!(remove_line("a\n  b  \nb", "b"), "a\nb");
        assert_eq!(remove_line("a", "zzz"), "a");
    }

    #[test]
    fn append_skips_separator_when_empty() {
        assert_eq!(append_line("", "x"), "x");
        assert_eq!(append_line("a", "x"), "a\nx");
    }
}
