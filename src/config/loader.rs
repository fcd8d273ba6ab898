//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listener port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid PORT value '{0}'")]
    Port(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, std::env::var(PORT_ENV).ok().as_deref())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Default configuration with environment overrides applied and validated.
pub fn default_config() -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();
    apply_env_overrides(&mut config, std::env::var(PORT_ENV).ok().as_deref())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Replace the port of `listener.bind_address` with `port`, when given.
pub fn apply_env_overrides(config: &mut RelayConfig, port: Option<&str>) -> Result<(), ConfigError> {
    let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let port: u16 = port.parse().map_err(|_| ConfigError::Port(port.to_string()))?;

    let host = config
        .listener
        .bind_address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or("0.0.0.0");
    config.listener.bind_address = format!("{}:{}", host, port);
    Ok(())
}
