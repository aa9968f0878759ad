//! Tracing initialization.

use crate::config::LogConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to set global subscriber: {0}")]
    SetSubscriber(String),
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `config.filter` when set. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .try_init()
        .map_err(|e| TelemetryError::SetSubscriber(e.to_string()))
}

fn build_filter(config: &LogConfig, env: Option<String>) -> Result<EnvFilter, TelemetryError> {
    let directives = match env {
        Some(d) if !d.trim().is_empty() => d,
        _ => config.filter.clone(),
    };
    Ok(EnvFilter::try_new(directives)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_config() {
        let config = LogConfig::default();
        let filter = build_filter(&config, Some("warn".to_string())).unwrap();
        assert!(filter.to_string().contains("warn"));
        assert!(!filter.to_string().contains("chainbft"));
        let filter = build_filter(&config, Some(" ".to_string())).unwrap();
        assert!(filter.to_string().contains("chainbft=debug"));
    }

    #[test]
    fn test_bad_filter_rejected() {
        let config = LogConfig {
            filter: "chainbft=notalevel".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            build_filter(&config, None),
            Err(TelemetryError::Filter(_))
        ));
    }
}
