//! Biomarker coverage check over a generated cohort

use crate::error::DuraxellError;
use crate::fhir::{BiomarkerSpec, Resource, file_patient_id, list_bundle_files, read_bundle, required_biomarkers};
use crate::synthea::Cohort;
use crate::system::System;
use anyhow::Result;
use core::fmt;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Coverage a biomarker needs to count as complete
pub const COMPLETE_THRESHOLD: f64 = 95.0;
/// Coverage below which a biomarker is reported as poor
pub const PARTIAL_THRESHOLD: f64 = 80.0;

/// Number of incomplete patients shown in the report
const MISSING_EXAMPLES: usize = 5;

/// Status marker of a coverage or completeness percentage
#[must_use]
pub fn status_marker(percentage: f64) -> &'static str {
    if percentage >= COMPLETE_THRESHOLD {
        "\u{2705}"
    } else if percentage >= PARTIAL_THRESHOLD {
        "\u{26a0}\u{fe0f}"
    } else {
        "\u{274c}"
    }
}

/// Share of `count` over `total`, as a percentage
#[must_use]
#[expect(
    clippy::as_conversions,
    clippy::cast_precision_loss,
    reason = "Patient counts stay far below 2^52"
)]
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = count as f64 / total as f64;
    ratio * 100.0
}

/// How many patients carry one biomarker
#[derive(Debug, Clone, PartialEq)]
pub struct BiomarkerCoverage {
    pub name: &'static str,
    pub present: usize,
    pub total: usize,
}

impl BiomarkerCoverage {
    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage(self.present, self.total)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percentage() >= COMPLETE_THRESHOLD
    }
}

/// A patient lacking at least one required biomarker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompletePatient {
    pub patient_id: String,
    pub found: Vec<&'static str>,
    pub missing: Vec<&'static str>,
}

/// Result of a coverage check
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub cohort: Cohort,
    pub total_patients: usize,
    /// Sorted by biomarker name
    pub coverage: Vec<BiomarkerCoverage>,
    pub incomplete_patients: Vec<IncompletePatient>,
}

impl CoverageReport {
    /// Every biomarker reaches the threshold and no patient misses one
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.incomplete_patients.is_empty() && self.coverage.iter().all(BiomarkerCoverage::is_complete)
    }

    /// Fail unless the cohort is complete
    ///
    /// # Errors
    ///
    /// Returns a verification error naming the incomplete biomarkers
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }

        let incomplete: Vec<&str> = self
            .coverage
            .iter()
            .filter(|coverage| !coverage.is_complete())
            .map(|coverage| coverage.name)
            .collect();
        Err(DuraxellError::verification(format!(
            "Biomarker coverage incomplete for the {} cohort: {} patient(s) missing biomarkers, below {COMPLETE_THRESHOLD}%: {}",
            self.cohort,
            self.incomplete_patients.len(),
            if incomplete.is_empty() { "none".to_owned() } else { incomplete.join(", ") }
        ))
        .into())
    }

    /// Human-readable report
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(70);
        let banner = "=".repeat(70);

        writeln!(out, "{banner}")?;
        writeln!(out, "BIOMARKER VERIFICATION - {} cancer", self.cohort.name().to_uppercase())?;
        writeln!(out, "{banner}")?;
        writeln!(out, "Patients analysed   : {}", self.total_patients)?;
        writeln!(out, "Required biomarkers : {}", self.coverage.len())?;
        writeln!(out)?;
        writeln!(out, "{:<20} {:<12} {:<15} Status", "Biomarker", "Present", "Coverage")?;
        writeln!(out, "{rule}")?;

        for coverage in &self.coverage {
            let pct = coverage.percentage();
            writeln!(
                out,
                "{:<20} {:>3}/{:<3}     {:>5.1}%          {}",
                coverage.name,
                coverage.present,
                coverage.total,
                pct,
                status_marker(pct)
            )?;
        }
        writeln!(out, "{rule}")?;

        if self.incomplete_patients.is_empty() {
            writeln!(out, "All patients carry every required biomarker")?;
        } else {
            writeln!(
                out,
                "{} patient(s) with missing biomarkers (first {MISSING_EXAMPLES}):",
                self.incomplete_patients.len()
            )?;
            for patient in self.incomplete_patients.iter().take(MISSING_EXAMPLES) {
                let found = if patient.found.is_empty() {
                    "none".to_owned()
                } else {
                    patient.found.join(", ")
                };
                writeln!(out, "  Patient : {}", patient.patient_id)?;
                writeln!(out, "    Found   : {found}")?;
                writeln!(out, "    Missing : {}", patient.missing.join(", "))?;
            }
        }

        writeln!(out, "{banner}")?;
        if self.is_complete() {
            writeln!(out, "VALIDATION PASSED - dataset ready for annotation")?;
        } else {
            writeln!(out, "VALIDATION INCOMPLETE - check the missing biomarkers")?;
        }
        write!(out, "{banner}")
    }
}

/// Biomarkers one bundle file carries, empty when the file is unreadable
fn scan_bundle(system: &dyn System, path: &Path, catalog: &[BiomarkerSpec]) -> BTreeSet<&'static str> {
    let bundle = match read_bundle(system, path) {
        Ok(bundle) => bundle,
        Err(err) => {
            warn!("Skipping {}: {err:#}", path.display());
            return BTreeSet::new();
        }
    };

    let mut found = BTreeSet::new();
    for resource in bundle.resources() {
        if let Resource::Observation(observation) = resource {
            for spec in catalog {
                if spec.matches(observation) {
                    found.insert(spec.name);
                }
            }
        }
    }
    found
}

fn scan_progress(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} bundles") {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

/// Count which required biomarkers each patient bundle carries
///
/// Every JSON file under `<output_dir>/fhir` counts as one patient.
///
/// # Errors
///
/// Returns a verification error if there are no bundles to analyse
pub fn verify_coverage(system: &dyn System, output_dir: &Path, cohort: Cohort) -> Result<CoverageReport> {
    let files = list_bundle_files(system, output_dir)?;
    let catalog = required_biomarkers(cohort);
    let total_patients = files.len();
    debug!("Analysing {total_patients} bundle(s) for the {cohort} cohort");

    let mut present = vec![0_usize; catalog.len()];
    let mut incomplete_patients = Vec::new();

    let progress = scan_progress(total_patients);
    for path in &files {
        let found = scan_bundle(system, path, catalog);

        for (count, spec) in present.iter_mut().zip(catalog) {
            if found.contains(spec.name) {
                *count += 1;
            }
        }

        let missing: Vec<&'static str> = catalog
            .iter()
            .map(|spec| spec.name)
            .filter(|name| !found.contains(name))
            .collect();
        if !missing.is_empty() {
            incomplete_patients.push(IncompletePatient {
                patient_id: file_patient_id(path),
                found: catalog.iter().map(|spec| spec.name).filter(|name| found.contains(name)).collect(),
                missing,
            });
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut coverage: Vec<BiomarkerCoverage> = catalog
        .iter()
        .zip(present)
        .map(|(spec, present)| BiomarkerCoverage {
            name: spec.name,
            present,
            total: total_patients,
        })
        .collect();
    coverage.sort_by_key(|entry| entry.name);

    Ok(CoverageReport {
        cohort,
        total_patients,
        coverage,
        incomplete_patients,
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use crate::system::MockSystem;

    fn observation(code: &str, display: &str) -> String {
        format!(
            r#"{{"resource": {{"resourceType": "Observation", "code": {{"coding": [{{"system": "http://loinc.org", "code": "{code}", "display": "{display}"}}]}}, "valueString": "x"}}}}"#
        )
    }

    fn bundle(observations: &[(&str, &str)]) -> Vec<u8> {
        let entries: Vec<String> = observations
            .iter()
            .map(|(code, display)| observation(code, display))
            .collect();
        format!(r#"{{"resourceType": "Bundle", "entry": [{}]}}"#, entries.join(",")).into_bytes()
    }

    fn complete_lung_bundle() -> Vec<u8> {
        bundle(&[
            ("21905-5", "Primary tumor"),
            ("21906-3", "Regional lymph nodes"),
            ("21907-1", "Distant metastases"),
            ("59847-4", "Histology"),
            ("81691-4", "EGFR"),
            ("80546-6", "ALK"),
            ("85147-7", "PD-L1"),
            ("20150-9", "FEV1"),
            ("19911-7", "DLCO"),
        ])
    }

    #[test]
    fn complete_cohort_passes() {
        let system = MockSystem::new()
            .with_file("/out/fhir/a.json", &complete_lung_bundle())
            .unwrap()
            .with_file("/out/fhir/b.json", &complete_lung_bundle())
            .unwrap();

        let report = verify_coverage(&system, Path::new("/out"), Cohort::Lung).unwrap();
        assert_eq!(report.total_patients, 2);
        assert_eq!(report.coverage.len(), 9);
        assert!(report.coverage.iter().all(|entry| entry.present == 2));
        assert!(report.is_complete());
        report.ensure_complete().unwrap();
        assert!(report.render().contains("VALIDATION PASSED"));
    }

    #[test]
    fn coverage_is_sorted_by_name() {
        let system = MockSystem::new()
            .with_file("/out/fhir/a.json", &complete_lung_bundle())
            .unwrap();
        let report = verify_coverage(&system, Path::new("/out"), Cohort::Lung).unwrap();
        let names: Vec<&str> = report.coverage.iter().map(|entry| entry.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn unreadable_bundle_counts_as_empty_patient() {
        let system = MockSystem::new()
            .with_file("/out/fhir/a.json", &complete_lung_bundle())
            .unwrap()
            .with_file("/out/fhir/broken.json", b"{not json")
            .unwrap();

        let report = verify_coverage(&system, Path::new("/out"), Cohort::Lung).unwrap();
        assert_eq!(report.total_patients, 2);
        assert_eq!(report.incomplete_patients.len(), 1);

        let broken = &report.incomplete_patients[0];
        assert_eq!(broken.patient_id, "broken");
        assert!(broken.found.is_empty());
        assert_eq!(broken.missing.len(), 9);

        let err = report.ensure_complete().unwrap_err();
        assert_eq!(exit_code_for(&err), 5);
    }

    #[test]
    fn keyword_matches_count() {
        let system = MockSystem::new()
            .with_file(
                "/out/fhir/a.json",
                &bundle(&[
                    ("0000-0", "Tumor staging"),
                    ("0000-0", "Lymph node involvement"),
                    ("0000-0", "Metastasis"),
                    ("0000-0", "Estrogen receptor"),
                    ("0000-0", "Progesterone receptor"),
                    ("0000-0", "HER2 status"),
                ]),
            )
            .unwrap();

        let report = verify_coverage(&system, Path::new("/out"), Cohort::Breast).unwrap();
        let patient = &report.incomplete_patients[0];
        assert_eq!(patient.found, vec!["TNM_T", "TNM_N", "TNM_M", "ER", "PR", "HER2"]);
        assert_eq!(patient.missing, vec!["Ki67", "Clinical_Stage"]);

        let rendered = report.render();
        assert!(rendered.contains("VALIDATION INCOMPLETE"));
        assert!(rendered.contains("Missing : Ki67, Clinical_Stage"));
    }

    #[test]
    fn report_lists_first_incomplete_patients() {
        let mut system = MockSystem::new();
        for index in 0..7 {
            system = system
                .with_file(format!("/out/fhir/p{index}.json"), &bundle(&[]))
                .unwrap();
        }

        let report = verify_coverage(&system, Path::new("/out"), Cohort::Breast).unwrap();
        let rendered = format!("{report}");
        assert_eq!(rendered, report.render());
        assert!(rendered.starts_with(&"=".repeat(70)));
        assert!(rendered.ends_with(&"=".repeat(70)));
        assert!(rendered.contains("7 patient(s) with missing biomarkers (first 5):"));
        assert_eq!(rendered.matches("  Patient : ").count(), 5);
        assert!(rendered.contains("    Found   : none"));
    }

    #[test]
    fn status_markers() {
        assert_eq!(status_marker(100.0), "\u{2705}");
        assert_eq!(status_marker(95.0), "\u{2705}");
        assert_eq!(status_marker(80.0), "\u{26a0}\u{fe0f}");
        assert_eq!(status_marker(79.9), "\u{274c}");
        assert!((percentage(19, 20) - 95.0).abs() < 1e-9);
        assert!(percentage(1, 0).abs() < 1e-9);
    }

    #[test]
    fn missing_fhir_directory_fails() {
        let err = verify_coverage(&MockSystem::new(), Path::new("/out"), Cohort::Breast).unwrap_err();
        assert_eq!(exit_code_for(&err), 5);
    }
}
