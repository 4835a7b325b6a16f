//! Cohort generation: one seeded Synthea run followed by an output check

use crate::config::Config;
use crate::operations::output::{OutputSummary, log_summary, verify_output};
use crate::operations::payloads::ensure_payload_installed;
use crate::synthea::{Cohort, SyntheaInstallation, SyntheaInvocation};
use crate::system::System;
use crate::utils::path::resolve_path;
use anyhow::Result;
use tracing::info;

/// Coordinates the generation of one cohort
#[non_exhaustive]
pub struct GenerateOperation<'src> {
    installation: SyntheaInstallation,
    invocation: SyntheaInvocation,
    dry_run: bool,
    system: &'src dyn System,
}

impl<'src> GenerateOperation<'src> {
    /// Build the invocation for `cohort`
    ///
    /// The output directory defaults to the cohort's directory under `output/`
    /// and is made absolute against the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A path cannot be resolved
    /// - The patient count is zero
    #[inline]
    pub fn new(
        config: &Config,
        cohort: Cohort,
        patients: u32,
        output_dir: Option<&str>,
        dry_run: bool,
        system: &'src dyn System,
    ) -> Result<Self> {
        let synthea_dir = resolve_path(system, &config.synthea_dir)?;
        let default_output = cohort.default_output_dir();
        let output_dir = resolve_path(system, output_dir.unwrap_or(&default_output))?;

        Ok(GenerateOperation {
            installation: SyntheaInstallation::new(synthea_dir),
            invocation: SyntheaInvocation::new(cohort, patients, output_dir)?,
            dry_run,
            system,
        })
    }

    #[must_use]
    pub const fn invocation(&self) -> &SyntheaInvocation {
        &self.invocation
    }

    #[must_use]
    pub const fn installation(&self) -> &SyntheaInstallation {
        &self.installation
    }

    /// Run Synthea and check that it wrote something
    ///
    /// Returns `None` for a dry run.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Synthea or the cohort's module is not installed
    /// - Synthea exits with a non-zero status
    /// - The output directory is empty afterwards
    #[inline]
    pub fn execute(&self) -> Result<Option<OutputSummary>> {
        if self.dry_run {
            info!("Dry run preview - no files will be modified:");
            info!("  Would run: {}", self.invocation.to_command(self.installation.root()));
            info!("");
            info!("Run without --dry-run to execute this command.");
            return Ok(None);
        }

        self.installation.ensure_installed(self.system)?;
        ensure_payload_installed(self.system, &self.installation, self.invocation.cohort)?;

        self.invocation.run(self.system, self.installation.root())?;

        let summary = verify_output(self.system, &self.invocation.output_dir)?;
        info!("\n\u{2713} Generated the {} cohort", self.invocation.cohort);
        log_summary(&self.invocation.output_dir, &summary);
        Ok(Some(summary))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use crate::synthea::{BASE_DIRECTORY_PROPERTY, BUILD_MARKER};
    use crate::system::{CommandOutput, MockSystem};
    use std::path::{Path, PathBuf};

    fn config() -> Config {
        Config {
            synthea_dir: "/opt/synthea".to_owned(),
            ..Config::default()
        }
    }

    fn installed() -> MockSystem {
        MockSystem::new()
            .with_current_dir("/work")
            .unwrap()
            .with_file("/opt/synthea/run_synthea", b"")
            .unwrap()
            .with_file("/opt/synthea/gradlew", b"")
            .unwrap()
            .with_file(format!("/opt/synthea/{BUILD_MARKER}"), b"")
            .unwrap()
            .with_file(
                "/opt/synthea/src/main/resources/modules/lung_cancer_enhanced.json",
                b"{}",
            )
            .unwrap()
    }

    #[test]
    fn default_output_is_resolved_against_cwd() {
        let system = installed();
        let operation = GenerateOperation::new(&config(), Cohort::Lung, 60, None, false, &system).unwrap();
        assert_eq!(
            operation.invocation().output_dir,
            PathBuf::from("/work/output/duraxell_lung")
        );
    }

    #[test]
    fn runs_and_verifies_output() {
        let system = installed()
            .with_program("run_synthea", |sys, command| {
                let base = command.property_value(BASE_DIRECTORY_PROPERTY).unwrap();
                let csv = Path::new(base).join("csv");
                sys.create_dir_all(&csv).unwrap();
                sys.write(&csv.join("patients.csv"), b"Id\n").unwrap();
                CommandOutput::success("")
            })
            .unwrap();

        let summary = GenerateOperation::new(&config(), Cohort::Lung, 5, Some("out"), false, &system)
            .unwrap()
            .execute()
            .unwrap()
            .unwrap();
        assert_eq!(summary.csv_files, 1);

        let runs = system.invocations_of("run_synthea");
        assert_eq!(runs[0].flag_value("-s"), Some("43"));
        assert_eq!(runs[0].flag_value("-p"), Some("5"));
        assert_eq!(
            runs[0].property_value(BASE_DIRECTORY_PROPERTY),
            Some("/work/out")
        );
    }

    #[test]
    fn missing_module_is_payload_error() {
        let system = installed();
        let err = GenerateOperation::new(&config(), Cohort::Breast, 5, None, false, &system)
            .unwrap()
            .execute()
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 3);
        assert!(system.invocations().is_empty());
    }

    #[test]
    fn missing_checkout_is_prerequisite_error() {
        let system = MockSystem::new().with_current_dir("/work").unwrap();
        let err = GenerateOperation::new(&config(), Cohort::Lung, 5, None, false, &system)
            .unwrap()
            .execute()
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn dry_run_spawns_nothing() {
        let system = installed();
        let result = GenerateOperation::new(&config(), Cohort::Lung, 5, None, true, &system)
            .unwrap()
            .execute()
            .unwrap();
        assert!(result.is_none());
        assert!(system.invocations().is_empty());
    }
}
