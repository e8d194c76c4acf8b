use super::types::*;
use crate::drivers::SCHED_DRIVER_SUFFIX;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Driver '{0}' not found")]
    DriverNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.global.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "data_dir must not be empty".to_string(),
        ));
    }

    if config.global.node_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "node_id must not be empty".to_string(),
        ));
    }

    if config.credentials.lock_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "credentials.lock_timeout_ms must be greater than zero".to_string(),
        ));
    }

    for name in config.drivers.keys() {
        validate_driver_name(name)?;
    }

    // The default may be served by its scheduler companion, as at request time
    if let Some(ref default) = config.default_driver {
        let enabled = |name: &str| config.drivers.get(name).is_some_and(|d| d.enabled);
        let companion = format!("{}{}", default, SCHED_DRIVER_SUFFIX);
        if !enabled(default) && !enabled(&companion) {
            return Err(ConfigError::DriverNotFound(default.clone()));
        }
    }

    Ok(())
}

fn validate_driver_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(ConfigError::ValidationError(format!(
            "Driver name '{}' must be non-empty and contain no '/'",
            name
        )));
    }
    Ok(())
}

/// Drivers to register at startup, sorted by name
pub fn enabled_drivers(config: &Config) -> Vec<(&str, DriverKind)> {
    let mut drivers: Vec<(&str, DriverKind)> = config
        .drivers
        .iter()
        .filter(|(_, driver)| driver.enabled)
        .map(|(name, driver)| (name.as_str(), driver.kind))
        .collect();
    drivers.sort_by_key(|(name, _)| *name);
    drivers
}
