//! Environment prerequisite checks

use crate::error::DuraxellError;
use crate::system::{CommandSpec, System};
use anyhow::{Context as _, Result, anyhow};
use std::io;
use tracing::{debug, info};

/// Lowest Java major version Synthea builds with
pub const DEFAULT_MIN_JAVA_VERSION: u32 = 11;

/// Versions found while checking the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteReport {
    pub java_major: u32,
    pub git_version: Option<(u32, u32, u32)>,
}

/// Check the Java runtime and, when a clone is pending, Git
///
/// # Errors
///
/// Returns an error if any required tool is missing or too old
pub fn check_prerequisites(
    system: &dyn System,
    min_java_version: u32,
    needs_git: bool,
) -> Result<PrerequisiteReport> {
    let java_major = check_java_availability(system, min_java_version)?;
    info!("  \u{2713} Java {java_major} runtime found");

    let git_version = if needs_git {
        let version = check_git_availability(system)?;
        info!("  \u{2713} Git {}.{}.{} found", version.0, version.1, version.2);
        Some(version)
    } else {
        debug!("Git not needed, Synthea is already installed");
        None
    };

    Ok(PrerequisiteReport {
        java_major,
        git_version,
    })
}

/// Check that a Java runtime is on the PATH and recent enough
///
/// # Errors
///
/// Returns an error if:
/// - The `java` command is not found
/// - The version output cannot be parsed
/// - The major version is below `min_major`
pub fn check_java_availability(system: &dyn System, min_major: u32) -> Result<u32> {
    let output = match system.execute(&CommandSpec::new("java").arg("-version")) {
        Ok(output) => output,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(DuraxellError::prerequisite(format!(
                "Java runtime not found. Install a JDK {min_major} or later and make sure 'java' is in PATH"
            ))
            .into());
        }
        Err(err) => return Err(err).context("Failed to execute java -version"),
    };

    if !output.is_success() {
        return Err(DuraxellError::prerequisite("Java command failed to execute properly").into());
    }

    // `java -version` historically prints to stderr
    let banner = if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };

    let major = parse_java_version(banner).map_err(|e| {
        DuraxellError::prerequisite(format!("Cannot determine Java version: {e}"))
    })?;

    if major < min_major {
        return Err(DuraxellError::prerequisite(format!(
            "Java {major} is too old. Synthea requires Java {min_major} or later"
        ))
        .into());
    }

    Ok(major)
}

/// Check that Git is available for cloning Synthea
///
/// # Errors
///
/// Returns an error if:
/// - The Git command is not found
/// - The Git command failed to execute properly
pub fn check_git_availability(system: &dyn System) -> Result<(u32, u32, u32)> {
    let output = match system.execute(&CommandSpec::new("git").arg("--version")) {
        Ok(output) => output,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(DuraxellError::prerequisite(
                "Git not found. Please ensure Git is installed and available in PATH",
            )
            .into());
        }
        Err(err) => return Err(err).context("Failed to execute git --version"),
    };

    if !output.is_success() {
        return Err(DuraxellError::prerequisite("Git command failed to execute properly").into());
    }

    let version_part = output
        .stdout
        .split_whitespace()
        .nth(2)
        .ok_or_else(|| DuraxellError::prerequisite("Unexpected git --version output"))?;

    parse_git_version(version_part)
        .map_err(|e| DuraxellError::prerequisite(format!("Cannot parse Git version: {e}")).into())
}

/// Extract the Java major version from a `java -version` banner
///
/// Handles both the legacy `1.8.0_292` scheme and the modern `17.0.2` one.
///
/// # Errors
///
/// Returns an error if no quoted version string is present
pub fn parse_java_version(banner: &str) -> Result<u32> {
    let version = banner
        .split('"')
        .nth(1)
        .ok_or_else(|| anyhow!("no version string in '{}'", banner.trim()))?;

    let mut parts = version.split(['.', '_', '-', '+']);
    let first = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| anyhow!("empty version string"))?;

    let major_part = if first == "1" {
        parts.next().ok_or_else(|| anyhow!("Invalid legacy version '{version}'"))?
    } else {
        first
    };

    major_part
        .parse()
        .with_context(|| format!("Invalid major version in '{version}'"))
}

/// Parse Git version string into tuple (major, minor, patch)
///
/// # Errors
///
/// Returns an error if the version string is invalid
pub fn parse_git_version(version: &str) -> Result<(u32, u32, u32)> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() >= 3 {
        let major = parts[0].parse().context("Invalid major version")?;
        let minor = parts[1].parse().context("Invalid minor version")?;
        let patch = parts[2]
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .unwrap_or_default()
            .parse()
            .context("Invalid patch version")?;
        Ok((major, minor, patch))
    } else {
        Err(anyhow!("Invalid version format"))
    }
}
