//! Configuration validation logic

use crate::config::Config;
use crate::error::DuraxellError;
use anyhow::Result;
use regex::Regex;

/// Validate a complete configuration
///
/// # Errors
///
/// Returns an error if:
/// - A directory setting is blank
/// - The repository URL or reference is malformed
/// - A numeric setting is out of range
#[inline]
pub fn validate_config(config: &Config) -> Result<()> {
    for (key, value) in [
        ("synthea_dir", &config.synthea_dir),
        ("modules_dir", &config.modules_dir),
        ("scripts_dir", &config.scripts_dir),
    ] {
        if value.trim().is_empty() {
            return Err(DuraxellError::configuration(format!("{key} cannot be empty")).into());
        }
    }

    validate_repository_url(&config.synthea_repository)?;

    if let Some(reference) = config.synthea_reference.as_deref() {
        validate_reference(reference)?;
    }

    if config.smoke_test_patients == 0 {
        return Err(
            DuraxellError::configuration("smoke_test_patients must be at least 1").into(),
        );
    }

    if config.min_java_version < 8 {
        return Err(DuraxellError::configuration(format!(
            "min_java_version {} is not a valid Java release",
            config.min_java_version
        ))
        .into());
    }

    Ok(())
}

/// Validate a repository URL format
///
/// # Errors
///
/// Returns an error if the repository URL is not an HTTPS, SSH or file URL
#[inline]
pub fn validate_repository_url(url: &str) -> Result<()> {
    let patterns = [
        r"^https?://\S+$",       // HTTPS: https://github.com/synthetichealth/synthea.git
        r"^git@[^\s:]+:\S+$",    // SSH: git@github.com:synthetichealth/synthea.git
        r"^file://\S+$",         // Local mirror: file:///srv/git/synthea
    ];

    for pattern in &patterns {
        let regex = Regex::new(pattern)?;
        if regex.is_match(url) {
            return Ok(());
        }
    }

    Err(DuraxellError::configuration(format!(
        "Invalid repository URL format: '{url}'\n\
        Supported formats:\n\
        - HTTPS: https://github.com/synthetichealth/synthea.git\n\
        - SSH: git@github.com:synthetichealth/synthea.git\n\
        - Local: file:///path/to/synthea"
    ))
    .into())
}

/// Validate a branch or tag name passed to `git clone --branch`
///
/// # Errors
///
/// Returns an error if the reference could be mistaken for an option or
/// contains characters Git rejects
#[inline]
pub fn validate_reference(reference: &str) -> Result<()> {
    let regex = Regex::new(r"^[A-Za-z0-9._/][A-Za-z0-9._/-]*$")?;
    if !regex.is_match(reference) || reference.contains("..") {
        return Err(DuraxellError::configuration(format!(
            "Invalid Synthea reference: '{reference}'"
        ))
        .into());
    }
    Ok(())
}
