use crate::config::DEFAULT_CONFIG_PATH;
use crate::synthea::{Cohort, DEFAULT_PATIENT_COUNT, OutputFormat};
use clap::{Parser, Subcommand};

/// Command-line arguments for duraxell
#[derive(Parser, Debug, Clone)]
#[command(name = "duraxell")]
#[command(about = "Install Synthea and generate synthetic breast and lung cancer cohorts")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "DURAXELL_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: String,

    /// Preview operations without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check prerequisites, install Synthea and the custom modules, then run a smoke test
    Install {
        /// Do not run the post-install smoke test
        #[arg(long)]
        skip_smoke_test: bool,

        /// Do not write the generate_<cohort>.sh wrapper scripts
        #[arg(long)]
        skip_scripts: bool,
    },

    /// Generate a cohort with its fixed module and seed
    Generate(CohortRunArgs),

    /// Print the Synthea command line for a cohort without running it
    #[command(name = "command")]
    ShowCommand {
        #[command(flatten)]
        run: CohortRunArgs,

        /// Output format: shell or json
        #[arg(long = "output-format", value_name = "FORMAT", default_value = "shell")]
        output_format: OutputFormat,
    },

    /// Report biomarker coverage of a generated cohort
    Verify {
        /// Directory Synthea wrote the cohort into
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: String,

        /// Cohort: lung or breast
        #[arg(value_name = "COHORT")]
        cohort: Cohort,
    },

    /// Extract structured biomarkers of a generated cohort into CSV
    Extract {
        /// Directory Synthea wrote the cohort into
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: String,

        /// Cohort: lung or breast
        #[arg(value_name = "COHORT")]
        cohort: Cohort,

        /// CSV file to write [default: duraxell_dataset_<cohort>_structured.csv]
        #[arg(long, value_name = "PATH")]
        csv: Option<String>,
    },

    /// Check the Java and Git prerequisites only
    Check,
}

/// Cohort, patient count and output directory of one generation run
#[derive(Parser, Debug, Clone)]
pub struct CohortRunArgs {
    /// Cohort: lung or breast
    #[arg(value_name = "COHORT")]
    pub cohort: Cohort,

    /// Number of patients to generate
    #[arg(
        short,
        long,
        value_name = "N",
        default_value_t = DEFAULT_PATIENT_COUNT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub patients: u32,

    /// Output directory [default: output/duraxell_<cohort>]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<String>,
}

impl Args {
    /// Machine-readable output must not be interleaved with logs
    #[must_use]
    pub const fn is_quiet_command(&self) -> bool {
        matches!(self.command, Command::ShowCommand { .. })
    }
}
