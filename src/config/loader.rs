//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::FleetConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Failure while reading, parsing or validating the configuration.
/// `Validation` carries every violation found, not just the first.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
            ConfigError::Validation(errors) => {
                let joined = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "invalid configuration: {joined}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a configuration from a TOML file, apply environment overrides,
/// and validate the result.
pub fn load_config(path: &Path) -> Result<FleetConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: FleetConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Secrets and the broker URL are deployment concerns and win over the
/// config file when set in the environment.
pub fn apply_env_overrides(config: &mut FleetConfig) {
    if let Ok(secret) = std::env::var("FLEET_ACCESS_SECRET") {
        config.auth.access_secret = secret;
    }
    if let Ok(secret) = std::env::var("FLEET_REFRESH_SECRET") {
        config.auth.refresh_secret = secret;
    }
    if let Ok(url) = std::env::var("FLEET_BROKER_URL") {
        if url.is_empty() {
            config.broker.url = None;
        } else {
            config.broker.url = Some(url);
        }
    }
}
