//! Synthea checkout: location, cloning and building

use crate::error::DuraxellError;
use crate::synthea::launcher_name;
use crate::system::{CommandSpec, System};
use crate::utils::fs::create_parent_directories;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory inside a checkout where Synthea looks up disease modules
pub const MODULES_SUBDIR: &str = "src/main/resources/modules";

/// Written into the checkout once the Gradle build has succeeded
pub const BUILD_MARKER: &str = ".duraxell-build-complete";

/// Gradle wrapper shipped with Synthea
#[must_use]
pub const fn gradle_wrapper_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "gradlew.bat"
    } else {
        "gradlew"
    }
}

/// A Synthea checkout on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheaInstallation {
    root: PathBuf,
}

impl SyntheaInstallation {
    /// Wrap an absolute checkout directory
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of the checkout
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `run_synthea` launcher
    #[must_use]
    pub fn launcher_path(&self) -> PathBuf {
        self.root.join(launcher_name())
    }

    /// Directory receiving the custom module payloads
    #[must_use]
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_SUBDIR)
    }

    /// Path of the Gradle wrapper
    #[must_use]
    pub fn gradle_wrapper_path(&self) -> PathBuf {
        self.root.join(gradle_wrapper_name())
    }

    /// Whether the checkout has both the launcher and the Gradle wrapper
    #[must_use]
    pub fn has_checkout(&self, system: &dyn System) -> bool {
        system.is_file(&self.launcher_path()) && system.is_file(&self.gradle_wrapper_path())
    }

    /// Whether a build of this checkout ran to completion
    #[must_use]
    pub fn is_built(&self, system: &dyn System) -> bool {
        system.is_file(&self.root.join(BUILD_MARKER))
    }

    /// Whether the checkout is present and built
    ///
    /// A clone whose build failed has the launcher on disk but no build
    /// marker, so it still counts as not installed.
    #[must_use]
    pub fn is_installed(&self, system: &dyn System) -> bool {
        self.has_checkout(system) && self.is_built(system)
    }

    /// Fail unless the checkout is usable
    ///
    /// # Errors
    ///
    /// Returns a prerequisite error pointing at `duraxell install`
    pub fn ensure_installed(&self, system: &dyn System) -> Result<()> {
        if self.is_installed(system) {
            return Ok(());
        }
        Err(DuraxellError::prerequisite(format!(
            "Synthea is not installed at {}. Run 'duraxell install' first",
            self.root.display()
        ))
        .into())
    }

    /// Shallow `git clone` of `repository` into the checkout directory
    #[must_use]
    pub fn clone_command(&self, repository: &str, reference: Option<&str>) -> CommandSpec {
        let mut command = CommandSpec::new("git").args(["clone", "--depth", "1"]);
        if let Some(reference) = reference {
            command = command.args(["--branch", reference]);
        }
        command.arg(repository).arg(self.root.to_string_lossy())
    }

    /// Gradle build of the checkout, skipping Synthea's own test suite
    #[must_use]
    pub fn build_command(&self) -> CommandSpec {
        CommandSpec::new(self.gradle_wrapper_path().to_string_lossy())
            .args(["build", "-x", "test"])
            .current_dir(&self.root)
            .inherit_stdio()
    }

    /// Clone Synthea into the checkout directory
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory exists, is not empty and is not a Synthea checkout
    /// - The clone fails
    pub fn clone_from(
        &self,
        system: &dyn System,
        repository: &str,
        reference: Option<&str>,
    ) -> Result<()> {
        if system.exists(&self.root) {
            let entries = system.read_dir(&self.root).with_context(|| {
                format!("Failed to inspect directory: {}", self.root.display())
            })?;
            if !entries.is_empty() {
                return Err(DuraxellError::configuration(format!(
                    "Directory {} exists but does not contain a Synthea checkout. \
                    Remove it or point synthea_dir elsewhere",
                    self.root.display()
                ))
                .into());
            }
        }

        create_parent_directories(system, &self.root)?;

        let command = self.clone_command(repository, reference);

        info!("Cloning Synthea from {repository}");
        debug!("Clone command: {command}");

        let output = system
            .execute(&command)
            .context("Failed to execute git clone command")?;

        if !output.is_success() {
            return Err(DuraxellError::command(format!(
                "Failed to clone repository '{}': {}",
                repository,
                output.stderr.trim()
            ))
            .into());
        }

        Ok(())
    }

    /// Build Synthea with its Gradle wrapper, skipping its own test suite
    ///
    /// The build marker is written only after Gradle succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The Gradle build fails
    /// - The build marker cannot be written
    pub fn build(&self, system: &dyn System) -> Result<()> {
        let command = self.build_command();

        info!("Building Synthea (this can take several minutes)");
        debug!("Build command: {command}");

        let output = system
            .execute(&command)
            .context("Failed to execute the Gradle wrapper")?;

        if !output.is_success() {
            return Err(DuraxellError::command(format!(
                "Synthea build failed with exit code {}\nWorking directory: {}",
                output.code.unwrap_or(-1),
                self.root.display()
            ))
            .into());
        }

        let marker = self.root.join(BUILD_MARKER);
        create_parent_directories(system, &marker)?;
        system.write(&marker, b"").map_err(|e| {
            DuraxellError::filesystem(format!(
                "Failed to record the Synthea build in {}: {e}",
                marker.display()
            ))
        })?;

        Ok(())
    }
}
