//! Path expansion and resolution utilities

use crate::error::DuraxellError;
use crate::system::System;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep leading '..' components
                if matches!(components.last(), None | Some(Component::ParentDir)) {
                    components.push(component);
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    if components.is_empty() {
        return PathBuf::from(".");
    }
    components.iter().collect()
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(system: &dyn System, path: &str) -> Result<PathBuf> {
    if path == "~" || path.starts_with("~/") {
        let home = system.home_dir().ok_or_else(|| {
            DuraxellError::configuration(format!(
                "Cannot determine home directory to expand '{path}'"
            ))
        })?;
        let rest = path.trim_start_matches('~').trim_start_matches('/');
        if rest.is_empty() {
            return Ok(home);
        }
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(path))
}

/// Resolve a user-supplied path to a normalized absolute path
///
/// Relative paths are anchored at the current working directory, so the
/// result stays valid when a child process runs from somewhere else.
pub fn resolve_path(system: &dyn System, path: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(system, path)?;

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        system
            .current_dir()
            .map_err(|e| DuraxellError::filesystem(format!("Cannot get current directory: {e}")))?
            .join(expanded)
    };

    Ok(normalize_path(&absolute))
}
