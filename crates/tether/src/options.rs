//! Bridge configuration
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! call_errors = "throw"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tether_sdk::{BridgeError, BridgeResult};

/// What happens when a wrapped host function returns an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallErrorMode {
    /// The call yields `undefined` to foreign code; the error is logged only
    #[default]
    Swallow,
    /// The error is raised as a foreign exception
    Throw,
}

/// Options shared by every conversion and callback a bridge creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Handling of host function error results
    pub call_errors: CallErrorMode,
}

impl BridgeOptions {
    /// Default options (errors swallowed)
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that raise host function errors in foreign code
    pub fn throwing() -> Self {
        Self {
            call_errors: CallErrorMode::Throw,
        }
    }

    /// Set the error handling mode
    pub fn with_call_errors(mut self, mode: CallErrorMode) -> Self {
        self.call_errors = mode;
        self
    }

    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> BridgeResult<Self> {
        toml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Render options as TOML
    pub fn to_toml_string(&self) -> BridgeResult<String> {
        toml::to_string_pretty(self).map_err(|e| BridgeError::Config(e.to_string()))
    }
}
