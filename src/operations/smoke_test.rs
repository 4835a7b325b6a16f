//! Post-install smoke test: a tiny seeded run into a throwaway directory

use crate::error::DuraxellError;
use crate::operations::output::{OutputSummary, verify_output};
use crate::synthea::{Cohort, SyntheaInvocation, SyntheaInstallation};
use crate::system::System;
use anyhow::{Context as _, Result};
use tracing::info;

/// Cohort exercised by the smoke test
pub const SMOKE_TEST_COHORT: Cohort = Cohort::Breast;

/// Generate a handful of patients and require non-empty output
///
/// # Errors
///
/// Returns an error if:
/// - Synthea fails to run
/// - The run leaves its output directory empty
pub fn run_smoke_test(
    system: &dyn System,
    installation: &SyntheaInstallation,
    patients: u32,
) -> Result<OutputSummary> {
    let temp_dir = system
        .create_temp_dir()
        .map_err(|e| {
            DuraxellError::filesystem(format!("Failed to create smoke test directory: {e}"))
        })?;
    let output_dir = temp_dir.path().join("smoke");

    info!(
        "Running smoke test: {} patient(s), {} cohort, seed {}",
        patients,
        SMOKE_TEST_COHORT,
        SMOKE_TEST_COHORT.seed()
    );

    let invocation = SyntheaInvocation::new(SMOKE_TEST_COHORT, patients, output_dir.clone())?;
    invocation
        .run(system, installation.root())
        .context("Smoke test failed")?;

    let summary = verify_output(system, &output_dir).context("Smoke test failed")?;
    info!(
        "  \u{2713} Smoke test produced {} file(s)",
        summary.total_files
    );

    // temp_dir is dropped here, removing the smoke test output
    Ok(summary)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use crate::synthea::BASE_DIRECTORY_PROPERTY;
    use crate::system::{CommandOutput, MockSystem};
    use std::path::{Path, PathBuf};

    fn installation() -> SyntheaInstallation {
        SyntheaInstallation::new(PathBuf::from("/opt/synthea"))
    }

    #[test]
    fn passes_when_synthea_writes_output() {
        let system = MockSystem::new()
            .with_program("run_synthea", |sys, command| {
                let base = command.property_value(BASE_DIRECTORY_PROPERTY).unwrap();
                let fhir = Path::new(base).join("fhir");
                sys.create_dir_all(&fhir).unwrap();
                sys.write(&fhir.join("patient.json"), b"{}").unwrap();
                CommandOutput::success("")
            })
            .unwrap();

        let summary = run_smoke_test(&system, &installation(), 1).unwrap();
        assert_eq!(summary.fhir_files, 1);

        let runs = system.invocations_of("run_synthea");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].flag_value("-s"), Some("42"));
        assert_eq!(runs[0].flag_value("-p"), Some("1"));

        // The throwaway directory is cleaned up
        let base = runs[0].property_value(BASE_DIRECTORY_PROPERTY).unwrap();
        assert!(!system.exists(Path::new(base)));
    }

    #[test]
    fn empty_output_fails() {
        let system = MockSystem::new()
            .with_program_output("run_synthea", CommandOutput::success(""))
            .unwrap();
        let err = run_smoke_test(&system, &installation(), 1).unwrap_err();
        assert_eq!(exit_code_for(&err), 5);
    }

    #[test]
    fn synthea_failure_propagates() {
        let system = MockSystem::new()
            .with_program_output("run_synthea", CommandOutput::failure(1, "boom"))
            .unwrap();
        let err = run_smoke_test(&system, &installation(), 1).unwrap_err();
        assert_eq!(exit_code_for(&err), 4);
    }
}
