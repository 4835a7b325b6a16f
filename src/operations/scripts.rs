//! Convenience wrapper scripts around the Synthea invocation

use crate::error::DuraxellError;
use crate::synthea::{BASE_DIRECTORY_PROPERTY, Cohort, DEFAULT_PATIENT_COUNT, EXPORT_FLAGS, launcher_name};
use crate::system::System;
use crate::utils::shell::shell_escape;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Render the wrapper script of one cohort
///
/// The script takes an optional patient count and output directory, and
/// forwards them with the cohort's fixed module and seed.
#[must_use]
pub fn render_wrapper_script(cohort: Cohort, synthea_dir: &Path) -> String {
    let export_flags = EXPORT_FLAGS.join(" \\\n    ");
    format!(
        r#"#!/usr/bin/env bash
# Generate the DuraXell {cohort} cancer cohort with Synthea.
# Usage: ./{script} [PATIENTS] [OUTPUT_DIR]
set -euo pipefail

PATIENTS="${{1:-{default_patients}}}"
OUTPUT_DIR="${{2:-{default_output}}}"

case "$PATIENTS" in
    ''|*[!0-9]*)
        echo "Error: patient count must be a positive integer (got '$PATIENTS')" >&2
        exit 1
        ;;
esac
if [ "$PATIENTS" -lt 1 ]; then
    echo "Error: patient count must be a positive integer (got '$PATIENTS')" >&2
    exit 1
fi

mkdir -p "$OUTPUT_DIR"
OUTPUT_DIR="$(cd "$OUTPUT_DIR" && pwd)"

echo "Generating $PATIENTS {cohort} cancer patients (seed {seed}) into $OUTPUT_DIR"
cd {synthea_dir}
exec ./{launcher} -p "$PATIENTS" -s {seed} -m {module} \
    {export_flags} \
    "{base_property}=$OUTPUT_DIR"
"#,
        cohort = cohort,
        script = cohort.script_file_name(),
        default_patients = DEFAULT_PATIENT_COUNT,
        default_output = cohort.default_output_dir(),
        seed = cohort.seed(),
        synthea_dir = shell_escape(&synthea_dir.to_string_lossy()),
        launcher = launcher_name(),
        module = cohort.module_name(),
        export_flags = export_flags,
        base_property = BASE_DIRECTORY_PROPERTY,
    )
}

/// Write both wrapper scripts and mark them executable
///
/// # Errors
///
/// Returns an error if a script cannot be written
pub fn write_wrapper_scripts(
    system: &dyn System,
    scripts_dir: &Path,
    synthea_dir: &Path,
) -> Result<Vec<PathBuf>> {
    system.create_dir_all(scripts_dir).map_err(|e| {
        DuraxellError::filesystem(format!(
            "Failed to create scripts directory {}: {e}",
            scripts_dir.display()
        ))
    })?;

    let mut written = Vec::with_capacity(Cohort::ALL.len());
    for cohort in Cohort::ALL {
        let path = scripts_dir.join(cohort.script_file_name());
        let script = render_wrapper_script(cohort, synthea_dir);

        system.write(&path, script.as_bytes()).map_err(|e| {
            DuraxellError::filesystem(format!("Failed to write {}: {e}", path.display()))
        })?;
        system.set_executable(&path).map_err(|e| {
            DuraxellError::filesystem(format!(
                "Failed to make {} executable: {e}",
                path.display()
            ))
        })?;

        info!("  \u{2713} Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn lung_script_embeds_fixed_parameters() {
        let script = render_wrapper_script(Cohort::Lung, Path::new("/opt/synthea"));
        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains(r#"PATIENTS="${1:-60}""#));
        assert!(script.contains(r#"OUTPUT_DIR="${2:-output/duraxell_lung}""#));
        assert!(script.contains("-s 43 -m lung_cancer_enhanced"));
        assert!(script.contains("cd /opt/synthea\n"));
        for flag in EXPORT_FLAGS {
            assert!(script.contains(flag), "{flag}");
        }
        assert!(script.contains(r#""--exporter.baseDirectory=$OUTPUT_DIR""#));
    }

    #[test]
    fn scripts_differ_only_in_cohort_constants() {
        let lung = render_wrapper_script(Cohort::Lung, Path::new("/opt/synthea"));
        let breast = render_wrapper_script(Cohort::Breast, Path::new("/opt/synthea"));
        let normalized = breast
            .replace("breast_cancer_enhanced", "lung_cancer_enhanced")
            .replace("-s 42", "-s 43")
            .replace("(seed 42)", "(seed 43)")
            .replace("breast", "lung");
        assert_eq!(normalized, lung);
    }

    #[test]
    fn synthea_dir_with_spaces_is_quoted() {
        let script = render_wrapper_script(Cohort::Breast, Path::new("/home/me/my tools/synthea"));
        assert!(script.contains("cd '/home/me/my tools/synthea'\n"));

        let script = render_wrapper_script(Cohort::Lung, Path::new("/home/o'neil/synthea"));
        assert!(script.contains(r"cd '/home/o'\''neil/synthea'"));
    }

    #[test]
    fn writes_executable_scripts() {
        let system = MockSystem::new();
        let written =
            write_wrapper_scripts(&system, Path::new("/work"), Path::new("/work/synthea")).unwrap();

        assert_eq!(
            written,
            vec![
                PathBuf::from("/work/generate_lung.sh"),
                PathBuf::from("/work/generate_breast.sh")
            ]
        );
        for path in &written {
            assert!(system.is_executable(path));
            assert!(system.read_to_string(path).unwrap().contains("exec ./"));
        }
    }
}
