//! File system utilities

use crate::system::System;
use anyhow::{Context as _, Result};
use std::path::Path;

/// Create parent directories for a file path if they don't exist
pub fn create_parent_directories(system: &dyn System, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent()
        && !parent.as_os_str().is_empty()
        && !system.exists(parent)
    {
        system.create_dir_all(parent).with_context(|| {
            format!(
                "Failed to create parent directories for: {}",
                file_path.display()
            )
        })?;
    }
    Ok(())
}

/// Count regular files anywhere below a directory
///
/// A missing directory counts as zero files.
pub fn count_files(system: &dyn System, dir_path: &Path) -> Result<usize> {
    if !system.is_dir(dir_path) {
        return Ok(0);
    }

    let entries = system
        .walk_dir(dir_path)
        .with_context(|| format!("Failed to walk directory: {}", dir_path.display()))?;
    Ok(entries.iter().filter(|entry| entry.is_file).count())
}

/// Check whether two files have byte-identical contents
pub fn files_identical(system: &dyn System, left: &Path, right: &Path) -> Result<bool> {
    let left_bytes = system
        .read(left)
        .with_context(|| format!("Failed to read file: {}", left.display()))?;
    let right_bytes = system
        .read(right)
        .with_context(|| format!("Failed to read file: {}", right.display()))?;
    Ok(left_bytes == right_bytes)
}

/// Format file size in human-readable format
#[must_use]
#[expect(
    clippy::as_conversions,
    clippy::cast_precision_loss,
    reason = "Display only"
)]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_owned();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
