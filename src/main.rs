//! # `DuraXell`
//!
//! `DuraXell` is a command-line tool that installs Synthea and generates synthetic
//! breast and lung cancer cohorts from two custom disease modules.
//!
//! ## Features
//! - Checks the Java runtime (and Git when a clone is needed) before doing anything.
//! - Clones and builds Synthea when it is absent, then installs the module payloads.
//! - Runs a seeded smoke test and writes `generate_lung.sh` / `generate_breast.sh`.
//! - Reports biomarker coverage and extracts a structured CSV dataset.
//!
//! ## Usage
//!
//! ```sh
//! duraxell install
//! duraxell generate breast --patients 100 --output output/breast
//! duraxell verify output/breast breast
//! ```
//!
//! See `duraxell --help` for more options and details.

use clap::Parser as _;
use duraxell::cli::Args;
use duraxell::error::exit_code_for;
use duraxell::system::RealSystem;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let args = Args::parse();

    // Keep stdout clean for the machine-readable `command` output
    let log_level = if args.is_quiet_command() {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_target(false).with_env_filter(filter).init();

    let system = RealSystem::new();
    match duraxell::run(&args, &system) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}
