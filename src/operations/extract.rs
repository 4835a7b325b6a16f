//! Structured biomarker extraction into a per-patient CSV dataset

use crate::error::DuraxellError;
use crate::fhir::{
    Bundle, Condition, LOINC_ALK, LOINC_DLCO, LOINC_EGFR, LOINC_ER, LOINC_FEV1, LOINC_HER2,
    LOINC_KI67, LOINC_PDL1, LOINC_PR, LOINC_TNM_M, LOINC_TNM_N, LOINC_TNM_T, Observation,
    ObservationValue, Patient, Resource, list_bundle_files, read_bundle,
};
use crate::operations::coverage::{percentage, status_marker};
use crate::synthea::Cohort;
use crate::system::System;
use crate::utils::fs::create_parent_directories;
use anyhow::Result;
use core::fmt;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const BREAST_COLUMNS: &[&str] = &[
    "patient_id",
    "age",
    "gender",
    "tnm_t",
    "tnm_n",
    "tnm_m",
    "tnm_complete",
    "er_status",
    "er_percentage",
    "pr_status",
    "pr_percentage",
    "her2_status",
    "ki67_percentage",
    "clinical_stage",
    "pathological_stage",
    "histology",
    "diagnosis_date",
];

const LUNG_COLUMNS: &[&str] = &[
    "patient_id",
    "age",
    "gender",
    "tnm_t",
    "tnm_n",
    "tnm_m",
    "tnm_complete",
    "histology",
    "egfr_mutation",
    "alk_status",
    "pdl1_percentage",
    "pdl1_category",
    "fev1_percentage",
    "fev1_category",
    "dlco_percentage",
    "dlco_category",
    "clinical_stage",
    "smoking_status",
    "diagnosis_date",
];

const PREVIEW_RECORDS: usize = 3;

/// CSV columns of a cohort's dataset, in output order
#[must_use]
pub const fn dataset_columns(cohort: Cohort) -> &'static [&'static str] {
    match cohort {
        Cohort::Lung => LUNG_COLUMNS,
        Cohort::Breast => BREAST_COLUMNS,
    }
}

/// Fields shown in the preview of extracted records
#[must_use]
pub const fn preview_columns(cohort: Cohort) -> [&'static str; 8] {
    match cohort {
        Cohort::Lung => [
            "patient_id",
            "age",
            "tnm_t",
            "tnm_n",
            "tnm_m",
            "histology",
            "egfr_mutation",
            "pdl1_percentage",
        ],
        Cohort::Breast => [
            "patient_id",
            "age",
            "tnm_t",
            "tnm_n",
            "tnm_m",
            "er_status",
            "her2_status",
            "ki67_percentage",
        ],
    }
}

/// Biomarkers of one patient
///
/// Only fields with a value are stored; absent fields render as empty cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiomarkerRecord {
    cohort: Cohort,
    values: HashMap<&'static str, String>,
}

impl BiomarkerRecord {
    #[must_use]
    pub fn new(cohort: Cohort) -> Self {
        Self {
            cohort,
            values: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn cohort(&self) -> Cohort {
        self.cohort
    }

    /// Value of a field, `None` when absent
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Set or clear a field
    pub fn set(&mut self, field: &'static str, value: Option<String>) {
        match value {
            Some(value) => {
                self.values.insert(field, value);
            }
            None => {
                self.values.remove(field);
            }
        }
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        dataset_columns(self.cohort)
            .iter()
            .map(|column| self.get(column).unwrap_or_default())
    }

    fn set_value(&mut self, field: &'static str, value: Option<&ObservationValue>) {
        self.set(field, value.map(ToString::to_string));
    }

    /// Store a reading and, when it is a non-zero number, the category it falls into
    fn set_categorized(
        &mut self,
        field: &'static str,
        category_field: &'static str,
        value: Option<&ObservationValue>,
        categorize: fn(f64) -> &'static str,
    ) {
        self.set_value(field, value);
        if let Some(number) = value.filter(|value| is_truthy(value)).and_then(ObservationValue::as_number) {
            self.set(category_field, Some(categorize(number).to_owned()));
        }
    }

    fn has_value(&self, field: &str) -> bool {
        self.get(field).is_some_and(|value| !value.is_empty())
    }
}

fn is_truthy(value: &ObservationValue) -> bool {
    match value {
        ObservationValue::Number(number) => *number != 0.0,
        ObservationValue::Text(text) => !text.is_empty(),
    }
}

/// Hormone receptor status from its staining percentage
#[must_use]
pub fn receptor_status(percentage: f64) -> &'static str {
    if percentage > 10.0 { "Positive" } else { "Negative" }
}

/// PD-L1 expression category
#[must_use]
pub fn pdl1_category(percentage: f64) -> &'static str {
    if percentage >= 50.0 {
        "High (\u{2265}50%)"
    } else if percentage >= 1.0 {
        "Low (1-49%)"
    } else {
        "Negative (<1%)"
    }
}

/// FEV1 category, percent of predicted
#[must_use]
pub fn fev1_category(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "Normal"
    } else if percentage >= 60.0 {
        "Mild obstruction"
    } else if percentage >= 40.0 {
        "Moderate obstruction"
    } else {
        "Severe obstruction"
    }
}

/// DLCO category, percent of predicted
#[must_use]
pub fn dlco_category(percentage: f64) -> &'static str {
    if percentage >= 75.0 {
        "Normal"
    } else if percentage >= 60.0 {
        "Mild reduction"
    } else if percentage >= 40.0 {
        "Moderate reduction"
    } else {
        "Severe reduction"
    }
}

fn apply_patient(record: &mut BiomarkerRecord, patient: &Patient, reference_year: i32) {
    record.set("patient_id", patient.id.clone());
    record.set("gender", patient.gender.clone());

    let birth_year = patient
        .birth_date
        .as_deref()
        .and_then(|date| date.split('-').next())
        .and_then(|year| year.parse::<i32>().ok());
    if let Some(birth_year) = birth_year {
        record.set("age", Some((reference_year - birth_year).to_string()));
    }
}

fn apply_condition(record: &mut BiomarkerRecord, condition: &Condition) {
    let cohort = record.cohort();
    for coding in &condition.code.coding {
        let display = coding.display.as_deref().unwrap_or_default().to_lowercase();
        if !(display.contains(cohort.organ()) && display.contains("cancer")) {
            continue;
        }

        record.set("diagnosis_date", condition.onset_date_time.clone());

        if cohort == Cohort::Breast {
            let histology = if display.contains("ductal") {
                Some("Invasive Ductal Carcinoma")
            } else if display.contains("lobular") {
                Some("Invasive Lobular Carcinoma")
            } else if display.contains("triple negative") {
                Some("Triple Negative Breast Cancer")
            } else {
                None
            };
            if let Some(histology) = histology {
                record.set("histology", Some(histology.to_owned()));
            }
        }
    }
}

/// Primary code and lowercased display of an observation
struct ObservationKey<'a> {
    code: &'a str,
    display: String,
}

impl ObservationKey<'_> {
    fn mentions(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|keyword| self.display.contains(keyword))
    }

    fn is(&self, loinc: &str, keywords: &[&str]) -> bool {
        self.code == loinc || self.mentions(keywords)
    }
}

/// Classify one observation; the first matching rule wins
fn apply_observation(record: &mut BiomarkerRecord, observation: &Observation) {
    let key = ObservationKey {
        code: observation.code.primary_code().unwrap_or_default(),
        display: observation.code.primary_display_lower(),
    };
    let value = observation.value();
    let value = value.as_ref();

    if key.is(LOINC_TNM_T, &["primary tumor"]) {
        record.set_value("tnm_t", value);
    } else if key.is(LOINC_TNM_N, &["lymph node"]) {
        record.set_value("tnm_n", value);
    } else if key.is(LOINC_TNM_M, &["metasta"]) {
        record.set_value("tnm_m", value);
    } else {
        match record.cohort() {
            Cohort::Breast => apply_breast_observation(record, &key, value),
            Cohort::Lung => apply_lung_observation(record, &key, value),
        }
    }
}

fn apply_breast_observation(
    record: &mut BiomarkerRecord,
    key: &ObservationKey<'_>,
    value: Option<&ObservationValue>,
) {
    if key.is(LOINC_ER, &["estrogen receptor"]) {
        record.set_categorized("er_percentage", "er_status", value, receptor_status);
    } else if key.is(LOINC_PR, &["progesterone receptor"]) {
        record.set_categorized("pr_percentage", "pr_status", value, receptor_status);
    } else if key.is(LOINC_HER2, &["her2", "her-2"]) {
        record.set_value("her2_status", value);
    } else if key.is(LOINC_KI67, &["ki-67", "ki67"]) {
        record.set_value("ki67_percentage", value);
    } else if key.mentions(&["clinical stage"]) {
        record.set_value("clinical_stage", value);
    } else if key.mentions(&["pathological stage"]) {
        record.set_value("pathological_stage", value);
    }
}

const LUNG_HISTOLOGIES: [(&str, &str); 4] = [
    ("adenocarcinoma", "Adenocarcinoma"),
    ("squamous", "Squamous Cell Carcinoma"),
    ("large cell", "Large Cell Carcinoma"),
    ("small cell", "Small Cell Lung Cancer"),
];

fn apply_lung_observation(
    record: &mut BiomarkerRecord,
    key: &ObservationKey<'_>,
    value: Option<&ObservationValue>,
) {
    let histology = LUNG_HISTOLOGIES
        .iter()
        .find(|(keyword, _)| key.display.contains(keyword));

    if let Some((_, histology)) = histology {
        record.set("histology", Some((*histology).to_owned()));
    } else if key.is(LOINC_EGFR, &["egfr"]) {
        record.set_value("egfr_mutation", value);
    } else if key.is(LOINC_ALK, &["alk"]) {
        record.set_value("alk_status", value);
    } else if key.is(LOINC_PDL1, &["pd-l1", "pdl1"]) {
        record.set_categorized("pdl1_percentage", "pdl1_category", value, pdl1_category);
    } else if key.is(LOINC_FEV1, &["fev1"]) {
        record.set_categorized("fev1_percentage", "fev1_category", value, fev1_category);
    } else if key.is(LOINC_DLCO, &["dlco"]) {
        record.set_categorized("dlco_percentage", "dlco_category", value, dlco_category);
    } else if key.mentions(&["clinical stage", "cancer stage"]) {
        record.set_value("clinical_stage", value);
    } else if key.mentions(&["smoking", "tobacco"]) {
        record.set_value("smoking_status", value);
    }
}

/// Extract the biomarkers of one patient bundle
///
/// Ages are computed against `reference_year`.
#[must_use]
pub fn extract_record(bundle: &Bundle, cohort: Cohort, reference_year: i32) -> BiomarkerRecord {
    let mut record = BiomarkerRecord::new(cohort);

    for resource in bundle.resources() {
        match resource {
            Resource::Patient(patient) => apply_patient(&mut record, patient, reference_year),
            Resource::Condition(condition) => apply_condition(&mut record, condition),
            Resource::Observation(observation) => apply_observation(&mut record, observation),
            Resource::Other => {}
        }
    }

    if record.has_value("tnm_t") && record.has_value("tnm_n") && record.has_value("tnm_m") {
        let complete = ["tnm_t", "tnm_n", "tnm_m"]
            .iter()
            .map(|field| record.get(field).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(", ");
        record.set("tnm_complete", Some(complete));
    }

    record
}

/// Extract one record per readable bundle under `<output_dir>/fhir`
///
/// Unreadable bundles are logged and skipped.
///
/// # Errors
///
/// Returns a verification error if there are no bundles or none can be read
pub fn extract_records(
    system: &dyn System,
    output_dir: &Path,
    cohort: Cohort,
    reference_year: i32,
) -> Result<Vec<BiomarkerRecord>> {
    let files = list_bundle_files(system, output_dir)?;
    info!("Extracting biomarkers from {} patient bundle(s)...", files.len());

    let mut records = Vec::with_capacity(files.len());
    for path in &files {
        match read_bundle(system, path) {
            Ok(bundle) => {
                debug!("Extracted {}", path.display());
                records.push(extract_record(&bundle, cohort, reference_year));
            }
            Err(err) => warn!("Skipping {}: {err:#}", path.display()),
        }
    }

    if records.is_empty() {
        return Err(DuraxellError::verification(format!(
            "No readable patient bundle in {}",
            output_dir.join("fhir").display()
        ))
        .into());
    }

    Ok(records)
}

/// Write the dataset as CSV, header first, in the cohort's column order
///
/// # Errors
///
/// Returns a filesystem error if the file cannot be written
pub fn write_dataset(
    system: &dyn System,
    path: &Path,
    cohort: Cohort,
    records: &[BiomarkerRecord],
) -> Result<()> {
    let write_error =
        |e: &dyn core::fmt::Display| DuraxellError::filesystem(format!("Failed to write {}: {e}", path.display()));

    create_parent_directories(system, path)?;
    let file = system.create(path).map_err(|e| write_error(&e))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(dataset_columns(cohort))
        .map_err(|e| write_error(&e))?;
    for record in records {
        writer.write_record(record.cells()).map_err(|e| write_error(&e))?;
    }
    writer.flush().map_err(|e| write_error(&e))?;

    info!("  \u{2713} Dataset saved: {}", path.display());
    Ok(())
}

/// Number of records carrying each field, most complete first
///
/// `patient_id` is left out; ties keep column order.
#[must_use]
pub fn field_completeness(cohort: Cohort, records: &[BiomarkerRecord]) -> Vec<(&'static str, usize)> {
    let mut completeness: Vec<(&'static str, usize)> = dataset_columns(cohort)
        .iter()
        .filter(|column| **column != "patient_id")
        .map(|column| {
            let filled = records
                .iter()
                .filter(|record| record.get(column).is_some())
                .count();
            (*column, filled)
        })
        .collect();
    completeness.sort_by(|left, right| right.1.cmp(&left.1));
    completeness
}

/// Completeness table followed by a preview of the first records
#[must_use]
pub fn render_summary(cohort: Cohort, records: &[BiomarkerRecord]) -> String {
    DatasetSummary { cohort, records }.to_string()
}

struct DatasetSummary<'rec> {
    cohort: Cohort,
    records: &'rec [BiomarkerRecord],
}

impl fmt::Display for DatasetSummary<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let banner = "=".repeat(70);
        let total = self.records.len();

        writeln!(out, "{banner}")?;
        writeln!(out, "EXTRACTION SUMMARY - {} cancer", self.cohort.name().to_uppercase())?;
        writeln!(out, "{banner}")?;
        writeln!(out, "Patients extracted: {total}")?;
        writeln!(out)?;
        writeln!(out, "Field completeness:")?;
        writeln!(out, "{:<25} {:<15} %", "Field", "Filled")?;
        writeln!(out, "{}", "-".repeat(50))?;

        for (field, filled) in field_completeness(self.cohort, self.records) {
            let pct = percentage(filled, total);
            writeln!(
                out,
                "{field:<25} {filled:>3}/{total:<3} ({pct:>5.1}%)  {}",
                status_marker(pct)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "Preview:")?;
        writeln!(out, "{}", "-".repeat(70))?;
        for (index, record) in self.records.iter().take(PREVIEW_RECORDS).enumerate() {
            writeln!(out, "Patient {}:", index + 1)?;
            for field in preview_columns(self.cohort) {
                writeln!(out, "  {field:20}: {}", record.get(field).unwrap_or("N/A"))?;
            }
        }
        write!(out, "{banner}")
    }
}
