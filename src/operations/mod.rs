//! Operations module
//!
//! Coordinates installation, generation, and the analysis of generated cohorts

pub mod coverage;
pub mod extract;
pub mod generate;
pub mod install;
pub mod output;
pub mod payloads;
pub mod scripts;
pub mod smoke_test;

pub use generate::GenerateOperation;
pub use install::{InstallOperation, InstallOptions, InstallSummary};
