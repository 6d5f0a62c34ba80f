//! Guided prompt wizard facade.
//!
//! Depend on this crate via `cargo add prompt-wizard`. It bundles the wizard
//! crates behind feature flags so embedders can leave out the pieces they
//! replace, such as the credential stores or the tracing setup.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use wizard_primitives as primitives;

/// Guided synthesis engine (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use wizard_kernel as kernel;

/// Provider adapters and HTTP transport (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use wizard_adapters as adapters;

/// Instruction templates and the step catalog (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use wizard_prompts as prompts;

/// Credential stores and resolution (enabled by `credentials` feature).
#[cfg(feature = "credentials")]
pub use wizard_credentials as credentials;

/// Configuration management (enabled by `config` feature).
#[cfg(feature = "config")]
pub use wizard_config as config;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use wizard_telemetry as telemetry;
