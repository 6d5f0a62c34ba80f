//! TOML and environment loading.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::schema::WizardConfig;
use crate::{ConfigError, ConfigResult};

/// Overrides the provider id.
pub const ENV_PROVIDER: &str = "PROMPT_WIZARD_PROVIDER";
/// Overrides the log filter.
pub const ENV_LOG: &str = "PROMPT_WIZARD_LOG";
/// Overrides the credential store path.
pub const ENV_CREDENTIALS: &str = "PROMPT_WIZARD_CREDENTIALS";

impl WizardConfig {
    /// Parses a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or mistyped values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: None,
            source: Box::new(source),
        })
    }

    /// Reads `path`, applies process environment overrides, and validates.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unreadable files, bad TOML, or invalid
    /// values.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source: Box::new(source),
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found; using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides read through `lookup`; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(provider) = read(ENV_PROVIDER) {
            self.provider = provider.trim().to_owned();
        }
        if let Some(filter) = read(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(path) = read(ENV_CREDENTIALS) {
            self.credentials.path = Some(PathBuf::from(path));
        }
    }
}
