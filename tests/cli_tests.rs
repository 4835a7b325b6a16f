//! CLI interface tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn duraxell(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("duraxell").unwrap();
    cmd.current_dir(dir).env_remove("DURAXELL_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn observation(code: &str, display: &str, value: &str) -> String {
    format!(
        r#"{{"resource": {{"resourceType": "Observation", "code": {{"coding": [{{"system": "http://loinc.org", "code": "{code}", "display": "{display}"}}]}}, "valueString": "{value}"}}}}"#
    )
}

fn breast_bundle(patient_id: &str, with_ki67: bool) -> String {
    let mut entries = vec![
        format!(
            r#"{{"resource": {{"resourceType": "Patient", "id": "{patient_id}", "gender": "female", "birthDate": "1971-02-03"}}}}"#
        ),
        observation("21905-5", "Primary tumor", "T2"),
        observation("21906-3", "Regional lymph nodes", "N0"),
        observation("21907-1", "Distant metastases", "M0"),
        observation("16112-5", "Estrogen receptor", "80"),
        observation("16113-3", "Progesterone receptor", "5"),
        observation("48676-1", "HER2", "Negative"),
        observation("21908-9", "Clinical stage group", "IIA"),
    ];
    if with_ki67 {
        entries.push(observation("85319-2", "Ki-67", "15"));
    }
    format!(r#"{{"resourceType": "Bundle", "entry": [{}]}}"#, entries.join(","))
}

fn write_cohort(root: &Path, bundles: &[(&str, String)]) {
    let fhir = root.join("fhir");
    fs::create_dir_all(&fhir).unwrap();
    for (name, content) in bundles {
        fs::write(fhir.join(format!("{name}.json")), content).unwrap();
    }
}

#[test]
fn test_version_flag() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("duraxell"));
}

#[test]
fn test_help_flag() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synthetic breast and lung cancer cohorts"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_unknown_cohort_rejected() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .args(["generate", "colon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("colon"));
}

#[test]
fn test_zero_patients_rejected() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .args(["generate", "lung", "--patients", "0"])
        .assert()
        .failure();
    duraxell(temp_dir.path())
        .args(["command", "lung", "-p", "abc"])
        .assert()
        .failure();
}

#[test]
fn test_command_shell_output() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .args(["command", "lung", "-p", "25"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "-p 25 -s 43 -m lung_cancer_enhanced --exporter.fhir.export=true --exporter.csv.export=true --exporter.clinical_note.export=true",
        ))
        .stdout(predicate::str::contains("output/duraxell_lung"))
        .stdout(predicate::str::contains("/synthea/run_synthea"));
}

#[test]
fn test_command_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = duraxell(temp_dir.path())
        .args(["command", "breast", "--output-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["cohort"], "breast");
    let args: Vec<&str> = json["args"]
        .as_array()
        .unwrap()
        .iter()
        .map(|arg| arg.as_str().unwrap())
        .collect();
    assert_eq!(&args[..6], ["-p", "60", "-s", "42", "-m", "breast_cancer_enhanced"]);
}

#[test]
fn test_missing_config_error() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .args(["--config", "nonexistent.yaml", "check"])
        .assert()
        .failure()
        .code(1) // Configuration error
        .stdout(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invalid.yaml");
    fs::write(&config_path, "synthea_dir: [unclosed\n").unwrap();

    duraxell(temp_dir.path())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(["generate", "lung"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Failed to parse YAML"));
}

#[test]
fn test_install_missing_payload() {
    let temp_dir = TempDir::new().unwrap();
    let modules = temp_dir.path().join("modules");
    fs::create_dir_all(&modules).unwrap();
    fs::write(modules.join("lung_cancer_enhanced.json"), "{}").unwrap();

    duraxell(temp_dir.path())
        .arg("install")
        .assert()
        .failure()
        .code(3) // Payload error
        .stdout(predicate::str::contains("breast_cancer_enhanced.json"));

    assert!(!temp_dir.path().join("synthea").exists());
}

#[test]
fn test_install_dry_run() {
    let temp_dir = TempDir::new().unwrap();
    let modules = temp_dir.path().join("modules");
    fs::create_dir_all(&modules).unwrap();
    fs::write(modules.join("lung_cancer_enhanced.json"), r#"{"name": "lung"}"#).unwrap();
    fs::write(modules.join("breast_cancer_enhanced.json"), r#"{"name": "breast"}"#).unwrap();

    duraxell(temp_dir.path())
        .args(["install", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run preview"))
        .stdout(predicate::str::contains("git clone --depth 1"));

    assert!(!temp_dir.path().join("synthea").exists());
    assert!(!temp_dir.path().join("generate_lung.sh").exists());
}

#[test]
fn test_generate_without_install() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .args(["generate", "breast", "-p", "3"])
        .assert()
        .failure()
        .code(2) // Prerequisite error
        .stdout(predicate::str::contains("duraxell install"));
}

#[test]
fn test_verify_complete_cohort() {
    let temp_dir = TempDir::new().unwrap();
    write_cohort(
        temp_dir.path(),
        &[("a", breast_bundle("a", true)), ("b", breast_bundle("b", true))],
    );

    duraxell(temp_dir.path())
        .args(["verify", ".", "breast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALIDATION PASSED"));
}

#[test]
fn test_verify_incomplete_cohort() {
    let temp_dir = TempDir::new().unwrap();
    write_cohort(
        temp_dir.path(),
        &[("a", breast_bundle("a", true)), ("b", breast_bundle("b", false))],
    );

    duraxell(temp_dir.path())
        .args(["verify", ".", "breast"])
        .assert()
        .failure()
        .code(5) // Verification error
        .stdout(predicate::str::contains("Missing : Ki67"));
}

#[test]
fn test_verify_without_fhir_output() {
    let temp_dir = TempDir::new().unwrap();
    duraxell(temp_dir.path())
        .args(["verify", "missing", "lung"])
        .assert()
        .failure()
        .code(5);
}

#[test]
fn test_extract_writes_csv() {
    let temp_dir = TempDir::new().unwrap();
    let cohort_dir = temp_dir.path().join("output");
    write_cohort(&cohort_dir, &[("a", breast_bundle("patient-a", true))]);

    duraxell(temp_dir.path())
        .args(["extract", "output", "breast", "--csv", "data/breast.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXTRACTION SUMMARY"))
        .stdout(predicate::str::contains("patient-a"));

    let csv = fs::read_to_string(temp_dir.path().join("data/breast.csv")).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("patient_id,age,gender,tnm_t"));
    assert!(lines.next().unwrap().starts_with("patient-a,"));
}

#[test]
fn test_extract_default_csv_name() {
    let temp_dir = TempDir::new().unwrap();
    write_cohort(temp_dir.path(), &[("a", breast_bundle("a", true))]);

    duraxell(temp_dir.path())
        .args(["extract", ".", "breast"])
        .assert()
        .success();

    assert!(
        temp_dir
            .path()
            .join("duraxell_dataset_breast_structured.csv")
            .exists()
    );
}
