//! Node configuration loaded from TOML.

use chainbft_bft::{ConfigError, SmrConfig};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default = "default_true")]
    pub ansi: bool,

    /// Include the event target (module path) in each line.
    #[serde(default = "default_true")]
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: true,
            with_target: true,
        }
    }
}

fn default_filter() -> String {
    "info,chainbft=debug".to_string()
}

fn default_true() -> bool {
    true
}

/// Top-level configuration of a node running the SMR.
///
/// ```toml
/// [smr]
/// strict_window = 3
/// permissive_window = 6
///
/// [log]
/// filter = "info,chainbft_bft=trace"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub smr: SmrConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Error)]
pub enum NodeConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid node config: {0}")]
    Parse(String),

    #[error(transparent)]
    Smr(#[from] ConfigError),
}

impl NodeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, NodeConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeConfigError::Parse(e.to_string()))?;
        config.smr.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
