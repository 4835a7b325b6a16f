//! Minimal FHIR bundle model covering what the biomarker analysis reads

use crate::error::DuraxellError;
use crate::system::System;
use anyhow::{Context as _, Result};
use core::fmt;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A FHIR `Bundle` as exported by Synthea, one per patient
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Resource>,
}

/// The resource types the analysis cares about; everything else is `Other`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(Patient),
    Condition(Condition),
    Observation(Observation),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub code: CodeableConcept,
    pub onset_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub code: CodeableConcept,
    pub value_quantity: Option<Quantity>,
    pub value_codeable_concept: Option<CodeableConcept>,
    pub value_string: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Quantity {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl CodeableConcept {
    /// First coding, which carries the primary code and display
    #[must_use]
    pub fn primary(&self) -> Option<&Coding> {
        self.coding.first()
    }

    /// Code of the first coding
    #[must_use]
    pub fn primary_code(&self) -> Option<&str> {
        self.primary().and_then(|coding| coding.code.as_deref())
    }

    /// Lowercased display of the first coding, empty when absent
    #[must_use]
    pub fn primary_display_lower(&self) -> String {
        self.primary()
            .and_then(|coding| coding.display.as_deref())
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Lowercased free text, empty when absent
    #[must_use]
    pub fn text_lower(&self) -> String {
        self.text.as_deref().unwrap_or_default().to_lowercase()
    }

    /// Whether any coding carries one of `codes`
    #[must_use]
    pub fn has_any_code(&self, codes: &[&str]) -> bool {
        self.coding
            .iter()
            .filter_map(|coding| coding.code.as_deref())
            .any(|code| codes.contains(&code))
    }
}

/// Value of an observation, either numeric or textual
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    Number(f64),
    Text(String),
}

impl ObservationValue {
    /// Numeric reading, parsing textual values when they hold a number
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().trim_end_matches('%').trim().parse().ok(),
        }
    }
}

impl fmt::Display for ObservationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl Observation {
    /// Value of the observation
    ///
    /// Quantities win over coded values, which win over plain strings.
    #[must_use]
    pub fn value(&self) -> Option<ObservationValue> {
        if let Some(quantity) = self.value_quantity.as_ref() {
            return quantity.value.map(ObservationValue::Number);
        }

        if let Some(concept) = self.value_codeable_concept.as_ref() {
            return concept
                .primary()
                .and_then(|coding| coding.display.clone())
                .map(ObservationValue::Text);
        }

        self.value_string.clone().map(ObservationValue::Text)
    }
}

impl Bundle {
    /// Iterate over the resources of the bundle
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().filter_map(|entry| entry.resource.as_ref())
    }
}

/// List the patient bundles exported under `<output_dir>/fhir`
///
/// # Errors
///
/// Returns a verification error if the directory is missing or holds no
/// JSON files
pub fn list_bundle_files(system: &dyn System, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let fhir_dir = output_dir.join("fhir");

    if !system.is_dir(&fhir_dir) {
        return Err(DuraxellError::verification(format!(
            "FHIR directory does not exist: {}",
            fhir_dir.display()
        ))
        .into());
    }

    let mut files: Vec<PathBuf> = system
        .read_dir(&fhir_dir)
        .with_context(|| format!("Failed to read directory: {}", fhir_dir.display()))?
        .into_iter()
        .filter(|path| {
            system.is_file(path)
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();

    if files.is_empty() {
        return Err(DuraxellError::verification(format!(
            "No FHIR files found in {}",
            fhir_dir.display()
        ))
        .into());
    }

    files.sort();
    Ok(files)
}

/// Read and parse one bundle file
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a bundle
pub fn read_bundle(system: &dyn System, path: &Path) -> Result<Bundle> {
    let content = system
        .read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Patient identifier derived from a bundle file name
#[must_use]
pub fn file_patient_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
