//! Biomarker catalog: which LOINC codes and keywords identify each biomarker

use crate::fhir::Observation;
use crate::synthea::Cohort;

/// Primary tumor (T)
pub const LOINC_TNM_T: &str = "21905-5";
/// Regional lymph nodes (N)
pub const LOINC_TNM_N: &str = "21906-3";
/// Distant metastases (M)
pub const LOINC_TNM_M: &str = "21907-1";
pub const LOINC_ER: &str = "16112-5";
pub const LOINC_PR: &str = "16113-3";
pub const LOINC_HER2: &str = "48676-1";
pub const LOINC_KI67: &str = "85319-2";
pub const LOINC_EGFR: &str = "81691-4";
pub const LOINC_ALK: &str = "80546-6";
pub const LOINC_PDL1: &str = "85147-7";
pub const LOINC_FEV1: &str = "20150-9";
pub const LOINC_DLCO: &str = "19911-7";

/// A biomarker the generated cohort must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiomarkerSpec {
    pub name: &'static str,
    pub codes: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

const TNM_T: BiomarkerSpec = BiomarkerSpec {
    name: "TNM_T",
    codes: &[LOINC_TNM_T],
    keywords: &["primary tumor", "tumor staging", "t stage", "tnm t"],
};

const TNM_N: BiomarkerSpec = BiomarkerSpec {
    name: "TNM_N",
    codes: &[LOINC_TNM_N],
    keywords: &["regional lymph", "node", "n stage", "tnm n", "lymph node"],
};

const TNM_M: BiomarkerSpec = BiomarkerSpec {
    name: "TNM_M",
    codes: &[LOINC_TNM_M],
    keywords: &["distant metasta", "m stage", "tnm m", "metastasis"],
};

const BREAST_BIOMARKERS: &[BiomarkerSpec] = &[
    TNM_T,
    TNM_N,
    TNM_M,
    BiomarkerSpec {
        name: "ER",
        codes: &[LOINC_ER],
        keywords: &["estrogen receptor", "er receptor", "er status"],
    },
    BiomarkerSpec {
        name: "PR",
        codes: &[LOINC_PR],
        keywords: &["progesterone receptor", "pr receptor", "pr status"],
    },
    BiomarkerSpec {
        name: "HER2",
        codes: &[LOINC_HER2],
        keywords: &["her2", "her-2", "erbb2"],
    },
    BiomarkerSpec {
        name: "Ki67",
        codes: &[LOINC_KI67],
        keywords: &["ki-67", "ki67", "mib-1"],
    },
    BiomarkerSpec {
        name: "Clinical_Stage",
        codes: &["21908-9", "21902-2"],
        keywords: &["clinical stage", "pathological stage", "cancer stage"],
    },
];

const LUNG_BIOMARKERS: &[BiomarkerSpec] = &[
    TNM_T,
    TNM_N,
    TNM_M,
    BiomarkerSpec {
        name: "Histology",
        codes: &["59847-4", "31206-6"],
        keywords: &["histolog", "carcinoma", "adenocarcinoma", "squamous"],
    },
    BiomarkerSpec {
        name: "EGFR",
        codes: &[LOINC_EGFR],
        keywords: &["egfr", "epidermal growth factor"],
    },
    BiomarkerSpec {
        name: "ALK",
        codes: &[LOINC_ALK],
        keywords: &["alk", "anaplastic lymphoma kinase"],
    },
    BiomarkerSpec {
        name: "PDL1",
        codes: &[LOINC_PDL1],
        keywords: &["pd-l1", "pdl1", "programmed death"],
    },
    BiomarkerSpec {
        name: "FEV1",
        codes: &[LOINC_FEV1],
        keywords: &["fev1", "forced expiratory volume"],
    },
    BiomarkerSpec {
        name: "DLCO",
        codes: &[LOINC_DLCO],
        keywords: &["dlco", "diffusing capacity"],
    },
];

/// Biomarkers required for a cohort
#[must_use]
pub const fn required_biomarkers(cohort: Cohort) -> &'static [BiomarkerSpec] {
    match cohort {
        Cohort::Lung => LUNG_BIOMARKERS,
        Cohort::Breast => BREAST_BIOMARKERS,
    }
}

impl BiomarkerSpec {
    /// Whether an observation records this biomarker
    ///
    /// Any coding with a listed code matches; otherwise a keyword must appear
    /// in the first coding's display or in the code text.
    #[must_use]
    pub fn matches(&self, observation: &Observation) -> bool {
        if observation.code.has_any_code(self.codes) {
            return true;
        }

        let display = observation.code.primary_display_lower();
        let text = observation.code.text_lower();
        self.keywords
            .iter()
            .any(|keyword| display.contains(keyword) || text.contains(keyword))
    }
}
