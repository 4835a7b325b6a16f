//! Configuration management module
//!
//! Handles YAML configuration parsing, JSON schema validation and defaults

pub mod schema;
pub mod validation;
pub mod yaml;

use crate::synthea::DEFAULT_MIN_JAVA_VERSION;
use crate::system::System;
use serde::{Deserialize, Serialize};

/// Configuration file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./duraxell.yaml";

/// Upstream Synthea repository
pub const DEFAULT_SYNTHEA_REPOSITORY: &str = "https://github.com/synthetichealth/synthea.git";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the Synthea checkout
    pub synthea_dir: String,

    /// Git URL Synthea is cloned from
    pub synthea_repository: String,

    /// Branch or tag to clone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthea_reference: Option<String>,

    /// Directory containing the two module payloads
    pub modules_dir: String,

    /// Directory receiving the wrapper scripts
    pub scripts_dir: String,

    /// Patients generated by the smoke test
    pub smoke_test_patients: u32,

    /// Lowest accepted Java major version
    pub min_java_version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            synthea_dir: "./synthea".to_owned(),
            synthea_repository: DEFAULT_SYNTHEA_REPOSITORY.to_owned(),
            synthea_reference: None,
            modules_dir: "./modules".to_owned(),
            scripts_dir: ".".to_owned(),
            smoke_test_patients: 1,
            min_java_version: DEFAULT_MIN_JAVA_VERSION,
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when the default file is absent
    ///
    /// # Errors
    ///
    /// Returns a configuration error if:
    /// - An explicitly given file does not exist or cannot be read
    /// - The file is not valid YAML or does not match the schema
    /// - A value fails semantic validation
    pub fn load(system: &dyn System, path: &str) -> anyhow::Result<Self> {
        yaml::load_or_default(system, path)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid value
    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_config(self)
    }
}
