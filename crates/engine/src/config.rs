use std::{env, path::Path};

use serde::{Deserialize, Serialize};
use taproot_util::expand_tilde;
use tracing::warn;

use crate::error::ConfigError;

/// Environment variable naming a JSON config file for [`RuntimeConfig::load`].
pub const CONFIG_PATH_ENV: &str = "TAPROOT_CONFIG_PATH";

pub const DEFAULT_CONTROLLERS_ATTRIBUTE: &str = "data-controllers";
pub const DEFAULT_ACTIONS_ATTRIBUTE: &str = "data-actions";

/// Runtime settings. Every field has a default, so partial files are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Attribute listing the descriptors bound to an element.
    pub controllers_attribute: String,
    /// Attribute listing declarative action bindings.
    pub actions_attribute: String,
    /// Treat panics inside controller hooks like returned errors.
    pub catch_panics: bool,
    /// Upper bound on record batches drained in one tick. Hooks that keep
    /// writing observed attributes would otherwise never settle.
    pub max_flush_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            controllers_attribute: DEFAULT_CONTROLLERS_ATTRIBUTE.to_string(),
            actions_attribute: DEFAULT_ACTIONS_ATTRIBUTE.to_string(),
            catch_panics: true,
            max_flush_rounds: 128,
        }
    }
}

impl RuntimeConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Loads the file named by [`CONFIG_PATH_ENV`], falling back to defaults
    /// when the variable is unset or the file cannot be used.
    pub fn load() -> Self {
        let Ok(path) = env::var(CONFIG_PATH_ENV) else {
            return Self::default();
        };
        if path.trim().is_empty() {
            return Self::default();
        }

        match Self::load_from_path(expand_tilde(&path)) {
            Ok(config) => config,
            Err(error) => {
                warn!(path = %path, error = %error, "ignoring unusable runtime config");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_attribute("controllers_attribute", &self.controllers_attribute)?;
        validate_attribute("actions_attribute", &self.actions_attribute)?;
        if self.controllers_attribute == self.actions_attribute {
            return Err(ConfigError::DuplicateAttribute {
                name: self.controllers_attribute.clone(),
            });
        }
        if self.max_flush_rounds == 0 {
            return Err(ConfigError::InvalidFlushLimit);
        }
        Ok(())
    }
}

fn validate_attribute(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '=' || c == '>' || c == '"') {
        return Err(ConfigError::InvalidAttribute {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
