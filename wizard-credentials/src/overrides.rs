//! Deployment-time credential overrides.

use std::collections::HashMap;

use wizard_primitives::Secret;

/// Source of secrets that take priority over anything stored.
pub trait OverrideSource: Send + Sync {
    /// Returns the override for `provider_id`, if one is configured.
    fn lookup(&self, provider_id: &str) -> Option<Secret>;
}

/// Reads overrides from process environment variables.
#[derive(Clone, Debug, Default)]
pub struct ProcessEnv {
    vars: HashMap<String, String>,
}

impl ProcessEnv {
    /// Creates a source with no provider mappings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `provider_id` to the environment variable `name`.
    #[must_use]
    pub fn with_var(mut self, provider_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.vars.insert(provider_id.into(), name.into());
        self
    }

    /// Variable consulted for `provider_id`.
    #[must_use]
    pub fn var_for(&self, provider_id: &str) -> Option<&str> {
        self.vars.get(provider_id).map(String::as_str)
    }
}

impl OverrideSource for ProcessEnv {
    fn lookup(&self, provider_id: &str) -> Option<Secret> {
        let name = self.vars.get(provider_id)?;
        std::env::var(name).ok().map(Secret::new)
    }
}

/// Fixed overrides, typically injected at build or test time.
#[derive(Clone, Debug, Default)]
pub struct StaticOverrides {
    secrets: HashMap<String, Secret>,
}

impl StaticOverrides {
    /// Creates an empty set of overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override for `provider_id`.
    #[must_use]
    pub fn with(mut self, provider_id: impl Into<String>, secret: Secret) -> Self {
        self.secrets.insert(provider_id.into(), secret);
        self
    }
}

impl OverrideSource for StaticOverrides {
    fn lookup(&self, provider_id: &str) -> Option<Secret> {
        self.secrets.get(provider_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_provider_has_no_override() {
        let env = ProcessEnv::new().with_var("openai", "PROMPT_WIZARD_TEST_UNSET_OPENAI_KEY");
        assert_eq!(env.var_for("openai"), Some("PROMPT_WIZARD_TEST_UNSET_OPENAI_KEY"));
        assert!(env.lookup("gemini").is_none());
        assert!(env.lookup("openai").is_none());
    }

    #[test]
    fn static_overrides_lookup() {
        let overrides = StaticOverrides::new().with("gemini", Secret::new("AIza"));
        assert_eq!(overrides.lookup("gemini").unwrap().expose(), "AIza");
        assert!(overrides.lookup("openai").is_none());
    }
}
