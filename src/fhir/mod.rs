//! FHIR output analysis module
//!
//! Reads the patient bundles Synthea exports and identifies cancer biomarkers

pub mod biomarkers;
pub mod bundle;

pub use biomarkers::*;
pub use bundle::*;
