//! Synthea command-line invocation

use crate::error::DuraxellError;
use crate::synthea::Cohort;
use crate::system::{CommandSpec, System};
use anyhow::{Context as _, Result};
use core::str::FromStr;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of patients generated when no count is given
pub const DEFAULT_PATIENT_COUNT: u32 = 60;

/// Exporters enabled on every run: FHIR bundles, CSV tables and clinical notes
pub const EXPORT_FLAGS: [&str; 3] = [
    "--exporter.fhir.export=true",
    "--exporter.csv.export=true",
    "--exporter.clinical_note.export=true",
];

/// Property that redirects all exporters to one directory
pub const BASE_DIRECTORY_PROPERTY: &str = "--exporter.baseDirectory";

/// Launcher script shipped at the root of a Synthea checkout
#[must_use]
pub const fn launcher_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "run_synthea.bat"
    } else {
        "run_synthea"
    }
}

/// One generation run of a cohort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheaInvocation {
    pub cohort: Cohort,
    pub patients: u32,
    pub output_dir: PathBuf,
}

impl SyntheaInvocation {
    /// Create an invocation
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The patient count is zero
    /// - The output directory is not absolute (Synthea runs from its own directory)
    pub fn new(cohort: Cohort, patients: u32, output_dir: PathBuf) -> Result<Self> {
        if patients == 0 {
            return Err(DuraxellError::configuration(
                "Patient count must be a positive integer",
            )
            .into());
        }

        if !output_dir.is_absolute() {
            return Err(DuraxellError::configuration(format!(
                "Output directory must be resolved to an absolute path: {}",
                output_dir.display()
            ))
            .into());
        }

        Ok(Self {
            cohort,
            patients,
            output_dir,
        })
    }

    /// Arguments forwarded to the Synthea launcher, in order
    #[must_use]
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_owned(),
            self.patients.to_string(),
            "-s".to_owned(),
            self.cohort.seed().to_string(),
            "-m".to_owned(),
            self.cohort.module_name().to_owned(),
        ];
        args.extend(EXPORT_FLAGS.iter().map(|flag| (*flag).to_owned()));
        args.push(format!(
            "{BASE_DIRECTORY_PROPERTY}={}",
            self.output_dir.display()
        ));
        args
    }

    /// Full command, run from the Synthea checkout with output streamed to the terminal
    ///
    /// The launcher is addressed by its absolute path; resolving a relative
    /// program against the working directory is not portable.
    #[must_use]
    pub fn to_command(&self, synthea_dir: &Path) -> CommandSpec {
        CommandSpec::new(synthea_dir.join(launcher_name()).to_string_lossy())
            .args(self.arguments())
            .current_dir(synthea_dir)
            .inherit_stdio()
    }

    /// Run Synthea and wait for it to finish
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The output directory cannot be created
    /// - The launcher cannot be started
    /// - Synthea exits with a non-zero status
    pub fn run(&self, system: &dyn System, synthea_dir: &Path) -> Result<()> {
        system
            .create_dir_all(&self.output_dir)
            .map_err(|e| {
                DuraxellError::filesystem(format!(
                    "Failed to create output directory {}: {e}",
                    self.output_dir.display()
                ))
            })?;

        let command = self.to_command(synthea_dir);
        info!(
            "Generating {} {} cancer patients (seed {})",
            self.patients,
            self.cohort,
            self.cohort.seed()
        );
        debug!("Synthea command: {command}");

        let output = system
            .execute(&command)
            .with_context(|| format!("Failed to launch Synthea: {command}"))?;

        if !output.is_success() {
            let mut message = format!(
                "Synthea exited with code {} for the {} cohort",
                output.code.unwrap_or(-1),
                self.cohort
            );
            if !output.stderr.trim().is_empty() {
                message.push_str(&format!("\nError output:\n{}", output.stderr.trim()));
            }
            return Err(DuraxellError::command(message).into());
        }

        Ok(())
    }
}

/// Output format for a rendered invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Shell,
    Json,
}

impl FromStr for OutputFormat {
    type Err = DuraxellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shell" => Ok(Self::Shell),
            "json" => Ok(Self::Json),
            _ => Err(DuraxellError::configuration(format!(
                "Invalid output format: '{s}'. Must be 'shell' or 'json'"
            ))),
        }
    }
}

#[derive(Serialize)]
struct RenderedCommand<'cmd> {
    cohort: Cohort,
    program: &'cmd str,
    args: &'cmd [String],
    working_directory: Option<&'cmd Path>,
}

/// Render the command that would run an invocation
///
/// # Errors
///
/// Returns an error if JSON serialization fails
pub fn render_command(
    invocation: &SyntheaInvocation,
    synthea_dir: &Path,
    format: OutputFormat,
) -> Result<String> {
    let command = invocation.to_command(synthea_dir);
    match format {
        OutputFormat::Shell => Ok(command.to_string()),
        OutputFormat::Json => {
            let rendered = RenderedCommand {
                cohort: invocation.cohort,
                program: &command.program,
                args: &command.args,
                working_directory: command.current_dir.as_deref(),
            };
            serde_json::to_string_pretty(&rendered)
                .context("Failed to serialize command to JSON")
        }
    }
}
