//! Guided synthesis engine for the prompt wizard.
//!
//! This crate owns the moving parts of a wizard session: step sequencing with
//! validation gates, per-field suggestion generation with retries and stale
//! result detection, deterministic document assembly, and the final synthesis
//! call. Network calls run on `tokio`; background prefetches go through a
//! bounded scheduler.

#![warn(missing_docs, clippy::pedantic)]

mod debounce;
mod document;
mod gateway;
mod generation;
mod retry;
mod scheduler;
mod sequencer;
mod session;
mod suggestions;

pub use debounce::{ActionKey, DebounceGuard};
pub use document::{Document, FieldMap, Section, assemble};
pub use gateway::{Connection, GatewayError, GatewayResult, ProviderGateway};
pub use generation::{
    Artifact, ArtifactSection, Cooldown, GenerationClient, GenerationError, GenerationResult,
};
pub use retry::RetryPolicy;
pub use scheduler::{SchedulerError, SchedulerResult, TaskScheduler};
pub use sequencer::{
    PrefetchHandle, Progress, SequencerError, SequencerResult, StepSequencer, Transition,
};
pub use session::{KEYRING_SERVICE, SessionError, SessionResult, WizardSession};
pub use suggestions::{
    GenerateOutcome, SuggestionEngine, SuggestionError, SuggestionItem, SuggestionResult,
    SuggestionSettings, parse_suggestions,
};
