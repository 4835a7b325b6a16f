//! `DuraXell` - install Synthea and generate synthetic cancer cohorts
//!
//! This library checks the Java/Git prerequisites, installs Synthea with the
//! custom lung and breast cancer modules, runs seeded generations, and
//! analyses the biomarkers of the generated FHIR bundles.

pub mod cli;
pub mod config;
pub mod error;
pub mod fhir;
pub mod operations;
pub mod synthea;
pub mod system;
pub mod utils;

use anyhow::Result;
use chrono::{Datelike as _, Local};
use cli::{Args, CohortRunArgs, Command};
use config::Config;
use operations::coverage::verify_coverage;
use operations::extract::{extract_records, render_summary, write_dataset};
use operations::{GenerateOperation, InstallOperation, InstallOptions};
use synthea::{Cohort, OutputFormat, SyntheaInstallation, check_prerequisites, render_command};
use system::System;
use tracing::info;
use utils::path::resolve_path;

/// Main entry point for the duraxell library
///
/// # Errors
///
/// Returns the first error of the selected subcommand
pub fn run(args: &Args, system: &dyn System) -> Result<()> {
    match &args.command {
        Command::Install {
            skip_smoke_test,
            skip_scripts,
        } => {
            let options = InstallOptions {
                skip_smoke_test: *skip_smoke_test,
                skip_scripts: *skip_scripts,
                dry_run: args.dry_run,
            };
            run_install(&args.config, options, system)
        }
        Command::Generate(run) => run_generate(&args.config, run, args.dry_run, system),
        Command::ShowCommand { run, output_format } => {
            run_show_command(&args.config, run, *output_format, system)
        }
        Command::Verify { output_dir, cohort } => run_verify(output_dir, *cohort, system),
        Command::Extract {
            output_dir,
            cohort,
            csv,
        } => run_extract(output_dir, *cohort, csv.as_deref(), system),
        Command::Check => run_check(&args.config, system),
    }
}

/// Run the install command
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any installation step fails
pub fn run_install(config_path: &str, options: InstallOptions, system: &dyn System) -> Result<()> {
    let config = Config::load(system, config_path)?;
    InstallOperation::new(config, options, system)?.execute()?;
    Ok(())
}

/// Run the generate command
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the generation fails
pub fn run_generate(
    config_path: &str,
    run: &CohortRunArgs,
    dry_run: bool,
    system: &dyn System,
) -> Result<()> {
    let config = Config::load(system, config_path)?;
    GenerateOperation::new(
        &config,
        run.cohort,
        run.patients,
        run.output.as_deref(),
        dry_run,
        system,
    )?
    .execute()?;
    Ok(())
}

/// Print the Synthea command line of a cohort
///
/// # Errors
///
/// Returns an error if the configuration is invalid or rendering fails
pub fn run_show_command(
    config_path: &str,
    run: &CohortRunArgs,
    format: OutputFormat,
    system: &dyn System,
) -> Result<()> {
    let config = Config::load(system, config_path)?;
    let operation = GenerateOperation::new(
        &config,
        run.cohort,
        run.patients,
        run.output.as_deref(),
        true,
        system,
    )?;

    let command_line = render_command(
        operation.invocation(),
        operation.installation().root(),
        format,
    )?;

    // Output to stdout (not using logging)
    println!("{command_line}");

    Ok(())
}

/// Print the biomarker coverage report of a generated cohort
///
/// # Errors
///
/// Returns a verification error when the cohort is incomplete
pub fn run_verify(output_dir: &str, cohort: Cohort, system: &dyn System) -> Result<()> {
    let output_dir = resolve_path(system, output_dir)?;
    info!("Verifying biomarkers of the {cohort} cohort in {}", output_dir.display());

    let report = verify_coverage(system, &output_dir, cohort)?;
    println!("{}", report.render());
    report.ensure_complete()
}

/// Extract the structured biomarker dataset of a generated cohort
///
/// # Errors
///
/// Returns an error if no bundle can be read or the CSV cannot be written
pub fn run_extract(
    output_dir: &str,
    cohort: Cohort,
    csv_path: Option<&str>,
    system: &dyn System,
) -> Result<()> {
    let output_dir = resolve_path(system, output_dir)?;
    let default_csv = cohort.dataset_file_name();
    let csv_path = resolve_path(system, csv_path.unwrap_or(&default_csv))?;

    let records = extract_records(system, &output_dir, cohort, Local::now().year())?;
    write_dataset(system, &csv_path, cohort, &records)?;

    println!("{}", render_summary(cohort, &records));
    info!("Dataset ready for annotation: {}", csv_path.display());
    Ok(())
}

/// Run the prerequisite checks and print the detected versions
///
/// # Errors
///
/// Returns a prerequisite error if a required tool is missing or too old
pub fn run_check(config_path: &str, system: &dyn System) -> Result<()> {
    let config = Config::load(system, config_path)?;
    let installation = SyntheaInstallation::new(resolve_path(system, &config.synthea_dir)?);
    let installed = installation.is_installed(system);

    let report = check_prerequisites(
        system,
        config.min_java_version,
        !installation.has_checkout(system),
    )?;

    println!("Java:    {}", report.java_major);
    match report.git_version {
        Some((major, minor, patch)) => println!("Git:     {major}.{minor}.{patch}"),
        None => println!("Git:     not required"),
    }
    if installed {
        println!("Synthea: installed at {}", installation.root().display());
    } else {
        println!("Synthea: not installed (run 'duraxell install')");
    }
    Ok(())
}
