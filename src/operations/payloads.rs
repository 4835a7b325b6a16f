//! Disease module payloads: locating, copying and checking them

use crate::error::DuraxellError;
use crate::synthea::{Cohort, SyntheaInstallation};
use crate::system::System;
use crate::utils::fs::{files_identical, format_file_size};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One module payload found in the modules directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePayload {
    pub cohort: Cohort,
    pub source: PathBuf,
}

/// Find and sanity-check the payload of every cohort
///
/// # Errors
///
/// Returns a payload error if any payload is missing, is not a regular file
/// or is not valid JSON
pub fn locate_payloads(system: &dyn System, modules_dir: &Path) -> Result<Vec<ModulePayload>> {
    Cohort::ALL
        .iter()
        .map(|cohort| locate_payload(system, modules_dir, *cohort))
        .collect()
}

fn locate_payload(system: &dyn System, modules_dir: &Path, cohort: Cohort) -> Result<ModulePayload> {
    let source = modules_dir.join(cohort.payload_file_name());

    if !system.exists(&source) {
        return Err(DuraxellError::payload(format!(
            "Module file not found: {}",
            source.display()
        ))
        .into());
    }

    if !system.is_file(&source) {
        return Err(DuraxellError::payload(format!(
            "Module path is not a file: {}",
            source.display()
        ))
        .into());
    }

    let content = system.read(&source).map_err(|e| {
        DuraxellError::payload(format!("Cannot read module {}: {e}", source.display()))
    })?;

    serde_json::from_slice::<serde_json::Value>(&content).map_err(|e| {
        DuraxellError::payload(format!(
            "Module {} is not valid JSON: {e}",
            source.display()
        ))
    })?;

    debug!("Found {} module payload at {}", cohort, source.display());

    Ok(ModulePayload { cohort, source })
}

/// Copy payloads into the Synthea modules directory and check the copies
///
/// Returns the installed paths in payload order.
///
/// # Errors
///
/// Returns an error if a copy fails or the copy is not byte-identical
pub fn install_payloads(
    system: &dyn System,
    payloads: &[ModulePayload],
    installation: &SyntheaInstallation,
) -> Result<Vec<PathBuf>> {
    let modules_dir = installation.modules_dir();
    system.create_dir_all(&modules_dir).map_err(|e| {
        DuraxellError::filesystem(format!(
            "Failed to create modules directory {}: {e}",
            modules_dir.display()
        ))
    })?;

    let mut installed = Vec::with_capacity(payloads.len());

    for payload in payloads {
        let target = modules_dir.join(payload.cohort.payload_file_name());

        let size = system.copy(&payload.source, &target).map_err(|e| {
            DuraxellError::filesystem(format!(
                "Failed to copy {} to {}: {e}",
                payload.source.display(),
                target.display()
            ))
        })?;

        if !files_identical(system, &payload.source, &target)? {
            return Err(DuraxellError::payload(format!(
                "Installed module {} differs from its source {}",
                target.display(),
                payload.source.display()
            ))
            .into());
        }

        info!(
            "  \u{2713} {} \u{2192} {} ({})",
            payload.cohort.payload_file_name(),
            target.display(),
            format_file_size(size)
        );
        installed.push(target);
    }

    Ok(installed)
}

/// Fail unless the cohort's module is present in the Synthea checkout
///
/// # Errors
///
/// Returns a payload error pointing at `duraxell install`
pub fn ensure_payload_installed(
    system: &dyn System,
    installation: &SyntheaInstallation,
    cohort: Cohort,
) -> Result<PathBuf> {
    let target = installation
        .modules_dir()
        .join(cohort.payload_file_name());
    if system.is_file(&target) {
        return Ok(target);
    }
    Err(DuraxellError::payload(format!(
        "Module {} is not installed in {}. Run 'duraxell install' first",
        cohort.module_name(),
        installation.modules_dir().display()
    ))
    .into())
}
