//! YAML configuration loading and parsing

use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::error::DuraxellError;
use crate::system::System;
use crate::utils::path::resolve_path;
use anyhow::{Context as _, Result};
use serde_json::Value;
use tracing::debug;

/// Load and parse YAML configuration from file
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist or cannot be read
/// - Its content is rejected by [`parse_config`]
pub fn load_config(system: &dyn System, path: &str) -> Result<Config> {
    let resolved = resolve_path(system, path)?;
    let path_obj = resolved.as_path();

    if !system.exists(path_obj) {
        return Err(DuraxellError::configuration(format!(
            "Configuration file not found: {path}\n\
            Create a duraxell.yaml file or specify a different path with --config"
        ))
        .into());
    }

    let content = system
        .read_to_string(path_obj)
        .with_context(|| format!("Failed to read configuration file: {path}"))?;

    parse_config(&content).with_context(|| format!("Invalid configuration file: {path}"))
}

/// Load the configuration file, or defaults when the default file does not exist
///
/// A path other than the default must exist.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or [`load_config`] fails
pub fn load_or_default(system: &dyn System, path: &str) -> Result<Config> {
    if path == DEFAULT_CONFIG_PATH && !system.exists(&resolve_path(system, path)?) {
        debug!("No {DEFAULT_CONFIG_PATH} found, using default configuration");
        return Ok(Config::default());
    }
    load_config(system, path)
}

/// Parse, schema-check and validate configuration text
///
/// # Errors
///
/// Returns a configuration error if:
/// - The text is not valid YAML
/// - The document does not match the configuration schema
/// - A value fails semantic validation
pub fn parse_config(content: &str) -> Result<Config> {
    let raw: Value = serde_yaml::from_str(content).map_err(|e| {
        DuraxellError::configuration(format!(
            "Failed to parse YAML configuration: {e}\n\
            Please check the syntax and structure of your configuration file"
        ))
    })?;

    // An empty document means "all defaults"
    let raw = if raw.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        raw
    };

    crate::config::schema::validate_against_schema(&raw)
        .map_err(|e| DuraxellError::configuration(e.to_string()))?;

    let config: Config = serde_json::from_value(raw)
        .map_err(|e| DuraxellError::configuration(format!("Invalid configuration value: {e}")))?;

    config.validate()?;

    Ok(config)
}
