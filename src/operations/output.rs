//! Inspection of generated output directories

use crate::error::DuraxellError;
use crate::system::System;
use crate::utils::fs::count_files;
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Exporter subdirectories Synthea writes under the base directory
pub const EXPORT_SUBDIRS: [&str; 3] = ["fhir", "csv", "notes"];

/// File counts of one generated output directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSummary {
    pub total_files: usize,
    pub fhir_files: usize,
    pub csv_files: usize,
    pub note_files: usize,
}

/// Check that a generation run produced at least one file
///
/// # Errors
///
/// Returns a verification error when the directory is missing or holds no
/// files at any depth
pub fn verify_output(system: &dyn System, output_dir: &Path) -> Result<OutputSummary> {
    if !system.is_dir(output_dir) {
        return Err(DuraxellError::verification(format!(
            "Output directory was not created: {}",
            output_dir.display()
        ))
        .into());
    }

    let total_files = count_files(system, output_dir)?;
    if total_files == 0 {
        return Err(DuraxellError::verification(format!(
            "Output directory is empty after generation: {}",
            output_dir.display()
        ))
        .into());
    }

    let [fhir, csv, notes] = EXPORT_SUBDIRS;
    Ok(OutputSummary {
        total_files,
        fhir_files: count_files(system, &output_dir.join(fhir))?,
        csv_files: count_files(system, &output_dir.join(csv))?,
        note_files: count_files(system, &output_dir.join(notes))?,
    })
}

/// Log an output summary
pub fn log_summary(output_dir: &Path, summary: &OutputSummary) {
    info!("  Output: {}", output_dir.display());
    info!("  FHIR bundles: {}", summary.fhir_files);
    info!("  CSV tables: {}", summary.csv_files);
    info!("  Clinical notes: {}", summary.note_files);
    info!("  Total files: {}", summary.total_files);
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use crate::system::MockSystem;

    #[test]
    fn counts_exporter_output() {
        let system = MockSystem::new()
            .with_file("/out/fhir/Ana_1.json", b"{}")
            .unwrap()
            .with_file("/out/fhir/hospitalInformation.json", b"{}")
            .unwrap()
            .with_file("/out/csv/patients.csv", b"Id\n")
            .unwrap()
            .with_file("/out/notes/Ana_1.txt", b"note")
            .unwrap();

        let summary = verify_output(&system, Path::new("/out")).unwrap();
        assert_eq!(
            summary,
            OutputSummary {
                total_files: 4,
                fhir_files: 2,
                csv_files: 1,
                note_files: 1,
            }
        );
    }

    #[test]
    fn empty_output_is_hard_failure() {
        let system = MockSystem::new().with_dir("/out/fhir").unwrap();
        let err = verify_output(&system, Path::new("/out")).unwrap_err();
        assert_eq!(exit_code_for(&err), 5);
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn missing_output_is_hard_failure() {
        let err = verify_output(&MockSystem::new(), Path::new("/out")).unwrap_err();
        assert_eq!(exit_code_for(&err), 5);
    }
}
