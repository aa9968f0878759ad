//! SMR configuration.

use chainbft_core::ConsensusConf;
use serde::Deserialize;
use thiserror::Error;

/// Configuration for the replication engine.
///
/// The two windows bound how far the SMR tolerates a rolled-back ledger.
/// They are policy: chains may tune them through their consensus config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmrConfig {
    /// Slack for vote rounds, parent views and pacemaker targets.
    #[serde(default = "default_strict_window")]
    pub strict_window: u64,

    /// Slack for proposal views and unknown justify targets. Looser than
    /// `strict_window` because the tree may be rebuilding after a restart.
    #[serde(default = "default_permissive_window")]
    pub permissive_window: u64,

    /// Capacity of the inbound message queue.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
}

impl Default for SmrConfig {
    fn default() -> Self {
        Self {
            strict_window: default_strict_window(),
            permissive_window: default_permissive_window(),
            inbound_capacity: default_inbound_capacity(),
        }
    }
}

fn default_strict_window() -> u64 {
    3
}

fn default_permissive_window() -> u64 {
    6
}

fn default_inbound_capacity() -> usize {
    1000
}

/// Errors loading an [`SmrConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid SMR config: {0}")]
    Parse(String),

    #[error("permissive_window ({permissive}) must not be smaller than strict_window ({strict})")]
    WindowOrder { strict: u64, permissive: u64 },

    #[error("inbound_capacity must be positive")]
    ZeroCapacity,
}

impl SmrConfig {
    /// Parse a TOML fragment. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the SMR section of the ledger's consensus config, or the defaults
    /// if the chain defines none.
    pub fn from_consensus_conf(conf: &ConsensusConf) -> Result<Self, ConfigError> {
        match conf.smr.as_deref() {
            Some(fragment) => Self::from_toml_str(fragment),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.permissive_window < self.strict_window {
            return Err(ConfigError::WindowOrder {
                strict: self.strict_window,
                permissive: self.permissive_window,
            });
        }
        if self.inbound_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}
