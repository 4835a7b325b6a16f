//! Installation coordination: payloads, prerequisites, checkout, smoke test and scripts

use crate::config::Config;
use crate::operations::output::OutputSummary;
use crate::operations::payloads::{ModulePayload, install_payloads, locate_payloads};
use crate::operations::scripts::write_wrapper_scripts;
use crate::operations::smoke_test::{SMOKE_TEST_COHORT, run_smoke_test};
use crate::synthea::{Cohort, SyntheaInstallation, check_prerequisites};
use crate::system::System;
use crate::utils::path::resolve_path;
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Steps the caller can opt out of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub skip_smoke_test: bool,
    pub skip_scripts: bool,
    pub dry_run: bool,
}

/// What an installation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// Synthea was cloned and built during this run
    pub cloned: bool,
    /// Synthea was built during this run
    pub built: bool,
    pub installed_modules: Vec<PathBuf>,
    pub smoke_test: Option<OutputSummary>,
    pub scripts: Vec<PathBuf>,
}

/// Coordinates the complete installation
#[non_exhaustive]
pub struct InstallOperation<'src> {
    config: Config,
    options: InstallOptions,
    installation: SyntheaInstallation,
    modules_dir: PathBuf,
    scripts_dir: PathBuf,
    system: &'src dyn System,
}

impl<'src> InstallOperation<'src> {
    /// Create an installation from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configured path cannot be resolved
    #[inline]
    pub fn new(config: Config, options: InstallOptions, system: &'src dyn System) -> Result<Self> {
        let synthea_dir = resolve_path(system, &config.synthea_dir)?;
        let modules_dir = resolve_path(system, &config.modules_dir)?;
        let scripts_dir = resolve_path(system, &config.scripts_dir)?;
        debug!(
            "Synthea: {}, modules: {}, scripts: {}",
            synthea_dir.display(),
            modules_dir.display(),
            scripts_dir.display()
        );

        Ok(InstallOperation {
            config,
            options,
            installation: SyntheaInstallation::new(synthea_dir),
            modules_dir,
            scripts_dir,
            system,
        })
    }

    /// Run every installation step, stopping at the first failure
    ///
    /// Payloads are checked before anything else, so a missing module file
    /// aborts the run before any process is spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A module payload is missing or invalid
    /// - Java or Git is missing or too old
    /// - Cloning or building Synthea fails
    /// - Copying the payloads fails
    /// - The smoke test produces no output
    /// - The wrapper scripts cannot be written
    #[inline]
    pub fn execute(&self) -> Result<InstallSummary> {
        let payloads = locate_payloads(self.system, &self.modules_dir)?;

        if self.options.dry_run {
            self.preview_operations(&payloads);
            return Ok(InstallSummary::default());
        }

        info!("Starting DuraXell installation...");

        info!("\n=> Checking prerequisites");
        let needs_clone = !self.installation.has_checkout(self.system);
        let needs_build = needs_clone || !self.installation.is_built(self.system);
        check_prerequisites(self.system, self.config.min_java_version, needs_clone)
            .context("Prerequisite check failed")?;

        info!("\n=> Synthea checkout");
        if needs_clone {
            self.installation.clone_from(
                self.system,
                &self.config.synthea_repository,
                self.config.synthea_reference.as_deref(),
            )?;
        }
        if needs_build {
            self.installation.build(self.system)?;
            info!("  \u{2713} Synthea built at {}", self.installation.root().display());
        } else {
            info!(
                "  \u{2713} Synthea already installed at {}",
                self.installation.root().display()
            );
        }

        info!("\n=> Installing module payloads");
        let installed_modules = install_payloads(self.system, &payloads, &self.installation)?;

        let smoke_test = if self.options.skip_smoke_test {
            info!("\n=> Smoke test skipped");
            None
        } else {
            info!("\n=> Smoke test");
            Some(run_smoke_test(
                self.system,
                &self.installation,
                self.config.smoke_test_patients,
            )?)
        };

        let scripts = if self.options.skip_scripts {
            info!("\n=> Wrapper scripts skipped");
            Vec::new()
        } else {
            info!("\n=> Writing wrapper scripts");
            write_wrapper_scripts(self.system, &self.scripts_dir, self.installation.root())?
        };

        info!("\n\u{2713} Installation complete");
        for cohort in Cohort::ALL {
            if scripts.is_empty() {
                info!("  duraxell generate {cohort}");
            } else {
                info!(
                    "  {} [PATIENTS] [OUTPUT_DIR]",
                    self.scripts_dir.join(cohort.script_file_name()).display()
                );
            }
        }

        Ok(InstallSummary {
            cloned: needs_clone,
            built: needs_build,
            installed_modules,
            smoke_test,
            scripts,
        })
    }

    /// Log what `execute` would do
    fn preview_operations(&self, payloads: &[ModulePayload]) {
        info!("Dry run preview - no files will be modified:");
        info!("");
        info!("Planned operations:");

        info!(
            "  [1] Check Java {} or later",
            self.config.min_java_version
        );

        if self.installation.is_installed(self.system) {
            info!(
                "  [2] Reuse Synthea at {}",
                self.installation.root().display()
            );
        } else if self.installation.has_checkout(self.system) {
            info!("  [2] Finish the interrupted Synthea build:");
            info!("        * {}", self.installation.build_command());
        } else {
            info!("  [2] Check Git, then install Synthea:");
            info!(
                "        * {}",
                self.installation.clone_command(
                    &self.config.synthea_repository,
                    self.config.synthea_reference.as_deref()
                )
            );
            info!("        * {}", self.installation.build_command());
        }

        info!("  [3] Copy module payloads:");
        let modules_dir = self.installation.modules_dir();
        for payload in payloads {
            info!(
                "        * {} \u{2192} {}",
                payload.source.display(),
                modules_dir.join(payload.cohort.payload_file_name()).display()
            );
        }

        if self.options.skip_smoke_test {
            info!("  [4] Skip the smoke test");
        } else {
            info!(
                "  [4] Smoke test: {} {} patient(s), seed {}, into a temporary directory",
                self.config.smoke_test_patients,
                SMOKE_TEST_COHORT,
                SMOKE_TEST_COHORT.seed()
            );
        }

        if self.options.skip_scripts {
            info!("  [5] Skip the wrapper scripts");
        } else {
            info!("  [5] Write wrapper scripts:");
            for cohort in Cohort::ALL {
                info!(
                    "        * {}",
                    self.scripts_dir.join(cohort.script_file_name()).display()
                );
            }
        }

        info!("");
        info!("Run without --dry-run to execute these operations.");
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use crate::synthea::{BASE_DIRECTORY_PROPERTY, BUILD_MARKER};
    use crate::system::{CommandOutput, MockSystem};
    use std::path::Path;

    fn java(banner: &str) -> CommandOutput {
        CommandOutput {
            code: Some(0),
            stdout: String::new(),
            stderr: banner.to_owned(),
        }
    }

    fn config() -> Config {
        Config {
            synthea_dir: "/work/synthea".to_owned(),
            modules_dir: "/work/modules".to_owned(),
            scripts_dir: "/work".to_owned(),
            ..Config::default()
        }
    }

    fn base_system() -> MockSystem {
        MockSystem::new()
            .with_current_dir("/work")
            .unwrap()
            .with_file("/work/modules/lung_cancer_enhanced.json", br#"{"name": "lung"}"#)
            .unwrap()
            .with_file("/work/modules/breast_cancer_enhanced.json", br#"{"name": "breast"}"#)
            .unwrap()
            .with_program_output("java", java("openjdk version \"17.0.2\" 2022-01-18"))
            .unwrap()
            .with_program("run_synthea", |sys, command| {
                let base = command.property_value(BASE_DIRECTORY_PROPERTY).unwrap();
                let fhir = Path::new(base).join("fhir");
                sys.create_dir_all(&fhir).unwrap();
                sys.write(&fhir.join("p.json"), b"{}").unwrap();
                CommandOutput::success("")
            })
            .unwrap()
    }

    fn installed_system() -> MockSystem {
        base_system()
            .with_file("/work/synthea/run_synthea", b"#!/bin/sh")
            .unwrap()
            .with_file("/work/synthea/gradlew", b"#!/bin/sh")
            .unwrap()
            .with_file(format!("/work/synthea/{BUILD_MARKER}"), b"")
            .unwrap()
    }

    #[test]
    fn reuses_existing_checkout() {
        let system = installed_system();
        let operation = InstallOperation::new(config(), InstallOptions::default(), &system).unwrap();
        let summary = operation.execute().unwrap();

        assert!(!summary.cloned);
        assert!(!summary.built);
        assert_eq!(summary.installed_modules.len(), 2);
        assert!(summary.smoke_test.is_some());
        assert_eq!(summary.scripts.len(), 2);
        assert!(system.invocations_of("git").is_empty());
        assert!(system.invocations_of("gradlew").is_empty());
    }

    #[test]
    fn clones_and_builds_when_absent() {
        let system = base_system()
            .with_program_output("git", CommandOutput::success("git version 2.43.0\n"))
            .unwrap()
            .with_program_output("gradlew", CommandOutput::success(""))
            .unwrap();
        let options = InstallOptions {
            skip_smoke_test: true,
            skip_scripts: true,
            dry_run: false,
        };
        let summary = InstallOperation::new(config(), options, &system)
            .unwrap()
            .execute()
            .unwrap();

        assert!(summary.cloned);
        let git = system.invocations_of("git");
        assert!(git.iter().any(|command| command.has_arg("clone")));
        assert_eq!(system.invocations_of("gradlew").len(), 1);
        assert!(system.invocations_of("run_synthea").is_empty());
        assert!(summary.scripts.is_empty());
    }

    #[test]
    fn rebuilds_checkout_whose_build_failed() {
        let system = base_system()
            .with_file("/work/synthea/run_synthea", b"#!/bin/sh")
            .unwrap()
            .with_file("/work/synthea/gradlew", b"#!/bin/sh")
            .unwrap()
            .with_program_output("gradlew", CommandOutput::success(""))
            .unwrap();
        let options = InstallOptions {
            skip_smoke_test: true,
            skip_scripts: true,
            dry_run: false,
        };
        let summary = InstallOperation::new(config(), options, &system)
            .unwrap()
            .execute()
            .unwrap();

        assert!(!summary.cloned);
        assert!(summary.built);
        assert!(system.invocations_of("git").is_empty());
        assert_eq!(system.invocations_of("gradlew").len(), 1);
        assert!(system.exists(&Path::new("/work/synthea").join(BUILD_MARKER)));
    }

    #[test]
    fn missing_payload_spawns_nothing() {
        let system = MockSystem::new()
            .with_current_dir("/work")
            .unwrap()
            .with_file("/work/modules/lung_cancer_enhanced.json", b"{}")
            .unwrap();
        let err = InstallOperation::new(config(), InstallOptions::default(), &system)
            .unwrap()
            .execute()
            .unwrap_err();

        assert_eq!(exit_code_for(&err), 3);
        assert!(system.invocations().is_empty());
    }

    #[test]
    fn old_java_stops_before_clone() {
        let system = base_system()
            .with_program_output("java", java("java version \"1.8.0_292\""))
            .unwrap();
        let err = InstallOperation::new(config(), InstallOptions::default(), &system)
            .unwrap()
            .execute()
            .unwrap_err();

        assert_eq!(exit_code_for(&err), 2);
        assert!(system.invocations_of("git").is_empty());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let system = installed_system();
        let options = InstallOptions {
            dry_run: true,
            ..InstallOptions::default()
        };
        let summary = InstallOperation::new(config(), options, &system)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(summary, InstallSummary::default());
        assert!(system.invocations().is_empty());
        assert!(!system.exists(Path::new("/work/generate_lung.sh")));
    }
}
