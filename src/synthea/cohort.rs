//! Disease cohorts and their fixed generation parameters

use crate::error::DuraxellError;
use core::fmt;
use core::str::FromStr;
use serde::Serialize;

/// A disease cohort backed by one custom Synthea module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    Lung,
    Breast,
}

impl Cohort {
    /// Every cohort, in installation order
    pub const ALL: [Self; 2] = [Self::Lung, Self::Breast];

    /// Short name used on the command line
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lung => "lung",
            Self::Breast => "breast",
        }
    }

    /// Synthea module name passed to `-m`
    #[must_use]
    pub const fn module_name(self) -> &'static str {
        match self {
            Self::Lung => "lung_cancer_enhanced",
            Self::Breast => "breast_cancer_enhanced",
        }
    }

    /// Fixed random seed for reproducible cohorts
    #[must_use]
    pub const fn seed(self) -> u64 {
        match self {
            Self::Lung => 43,
            Self::Breast => 42,
        }
    }

    /// File name of the module payload
    #[must_use]
    pub fn payload_file_name(self) -> String {
        format!("{}.json", self.module_name())
    }

    /// Output directory used when none is given
    #[must_use]
    pub fn default_output_dir(self) -> String {
        format!("output/duraxell_{}", self.name())
    }

    /// File name of the generated convenience wrapper
    #[must_use]
    pub fn script_file_name(self) -> String {
        format!("generate_{}.sh", self.name())
    }

    /// Name of the extracted CSV dataset
    #[must_use]
    pub fn dataset_file_name(self) -> String {
        format!("duraxell_dataset_{}_structured.csv", self.name())
    }

    /// Word that identifies this cancer in a condition display
    #[must_use]
    pub const fn organ(self) -> &'static str {
        self.name()
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cohort {
    type Err = DuraxellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lung" => Ok(Self::Lung),
            "breast" => Ok(Self::Breast),
            _ => Err(DuraxellError::configuration(format!(
                "Unsupported cancer type '{s}'. Supported types: lung, breast"
            ))),
        }
    }
}
