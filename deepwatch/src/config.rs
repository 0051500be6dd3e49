//! Configuration parsing and management.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a [`WatchConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The text is not a valid configuration
    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Process-wide defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Reject unsupported object kinds instead of passing them through
    #[serde(default = "default_true")]
    pub strict: bool,

    /// How deeply observers may nest mutations inside their own notifications
    #[serde(default = "default_max_dispatch_depth")]
    pub max_dispatch_depth: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_dispatch_depth() -> usize {
    64
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            strict: default_true(),
            max_dispatch_depth: default_max_dispatch_depth(),
        }
    }
}

impl WatchConfig {
    /// Parse YAML text; absent fields take their defaults
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Load a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    /// Options for a `wrap` call using these defaults
    pub fn wrap_options(&self) -> WrapOptions {
        WrapOptions {
            strict: self.strict,
        }
    }
}

/// Per-call wrapping options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapOptions {
    /// Reject unsupported object kinds instead of passing them through
    pub strict: bool,
}

impl WrapOptions {
    /// Reject unsupported object kinds
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Pass unsupported object kinds through unwrapped
    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

impl Default for WrapOptions {
    fn default() -> Self {
        current_config().wrap_options()
    }
}

static CONFIG: Lazy<RwLock<WatchConfig>> = Lazy::new(|| RwLock::new(WatchConfig::default()));

/// Replace the process-wide configuration
pub fn configure(config: WatchConfig) {
    tracing::debug!(?config, "deepwatch configured");
    *CONFIG.write() = config;
}

/// Copy of the process-wide configuration
pub fn current_config() -> WatchConfig {
    CONFIG.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::default();
        assert!(config.strict);
        assert_eq!(config.max_dispatch_depth, 64);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = WatchConfig::from_yaml_str("strict: false\n").unwrap();
        assert!(!config.strict);
        assert_eq!(config.max_dispatch_depth, 64);
    }

    #[test]
    fn test_parse_error() {
        let err = WatchConfig::from_yaml_str("max_dispatch_depth: [1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
