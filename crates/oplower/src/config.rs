use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::target::TargetFormat;

/// Configuration IO error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid format.
    #[error("Config error => Invalid format: {0}")]
    InvalidFormat(String),

    /// File not found.
    #[error("Config error => File not found: {0}")]
    FileNotFound(String),
}

/// Options of a lowering pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, new)]
pub struct LoweringConfig {
    /// Format of the produced program.
    #[serde(default)]
    pub format: TargetFormat,
}

impl LoweringConfig {
    /// Set the target format.
    pub fn with_format(mut self, format: TargetFormat) -> Self {
        self.format = format;
        self
    }

    /// Saves the configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(file, json)
    }

    /// Loads the configuration from a file.
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(file.as_ref())
            .map_err(|_| ConfigError::FileNotFound(file.as_ref().to_string_lossy().to_string()))?;
        Self::from_json(&content)
    }

    /// Parses the configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::InvalidFormat(format!("{err}")))
    }
}
