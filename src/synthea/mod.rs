//! Synthea integration module
//!
//! Handles the external generator: cohort constants, prerequisite checks,
//! installation and command-line invocation

pub mod cohort;
pub mod installation;
pub mod invocation;
pub mod prerequisites;

pub use cohort::*;
pub use installation::*;
pub use invocation::*;
pub use prerequisites::*;
