//! Core shared types for the prompt wizard.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod secret;
mod step;

/// Error type and result alias shared across the wizard crates.
pub use error::{Error, Result};
/// Field and session identifiers.
pub use ids::{FieldId, SessionId};
/// Redacting credential wrapper.
pub use secret::Secret;
/// Step descriptors and their validation rules.
pub use step::{GateViolation, SelectionPolicy, Step, StepBuilder, ValidationGate};
