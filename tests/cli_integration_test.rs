mod common;

use std::fs;
use std::process::Command;

use common::{TestFixtures, reports_with_prefix, write_file};
use tempfile::TempDir;

fn xml_shape() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_xml-shape"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn test_cli_help_output() {
    let output = xml_shape()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(stdout.contains("Summarize the element, attribute and text structure"));
    assert!(stdout.contains("--dtd"));
    assert!(stdout.contains("--output-dir"));
    assert!(stdout.contains("--first-snapshot"));
    assert!(stdout.contains("--snapshot-every"));
    assert!(stdout.contains("--no-snapshots"));
    assert!(stdout.contains("--rarely-threshold"));
    assert!(stdout.contains("--verbose"));
    assert!(stdout.contains("--quiet"));
    assert!(stdout.contains("--config"));
}

#[test]
fn test_cli_version_output() {
    let output = xml_shape()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(concat!("xml-shape ", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_cli_missing_file_error() {
    let output = xml_shape()
        .arg("/nonexistent/document.xml")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Path does not exist"));
}

#[test]
fn test_cli_writes_final_report() {
    let fixtures = TestFixtures::new();
    let temp_dir = TempDir::new().unwrap();

    let output = xml_shape()
        .current_dir(temp_dir.path())
        .arg("--dtd")
        .arg(fixtures.library_dtd())
        .arg("--output-dir")
        .arg(temp_dir.path())
        .arg("--no-snapshots")
        .arg(fixtures.library_xml())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let finals = reports_with_prefix(temp_dir.path(), "structure-final");
    assert_eq!(finals.len(), 1);
    assert!(reports_with_prefix(temp_dir.path(), "structure").is_empty());

    // The report path is printed on stdout
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), finals[0].display().to_string());

    let report = fs::read_to_string(&finals[0]).unwrap();
    assert!(report.starts_with("- library required\n - book multiple"));
}

#[test]
fn test_cli_quiet_prints_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let xml = write_file(temp_dir.path(), "doc.xml", "<doc><a/><a/></doc>");

    let output = xml_shape()
        .current_dir(temp_dir.path())
        .arg("-q")
        .arg(&xml)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    assert_eq!(reports_with_prefix(temp_dir.path(), "structure-final").len(), 1);
}

#[test]
fn test_cli_malformed_document_fails() {
    let temp_dir = TempDir::new().unwrap();
    let xml = write_file(temp_dir.path(), "broken.xml", "<doc><a></doc>");

    let output = xml_shape()
        .current_dir(temp_dir.path())
        .arg(&xml)
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to analyze"));
    assert!(reports_with_prefix(temp_dir.path(), "structure-final").is_empty());
}

#[test]
fn test_cli_reads_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let xml = write_file(temp_dir.path(), "doc.xml", "<doc><a/><a/></doc>");
    write_file(
        temp_dir.path(),
        "xml-shape.toml",
        "[output]\ndirectory = \"out\"\nfinal_prefix = \"shape\"\n",
    );

    let output = xml_shape()
        .current_dir(temp_dir.path())
        .arg(&xml)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let reports = reports_with_prefix(&temp_dir.path().join("out"), "shape");
    assert_eq!(reports.len(), 1);
    assert_eq!(
        fs::read_to_string(&reports[0]).unwrap(),
        "- doc required\n - a multiple\n"
    );
}

#[test]
fn test_cli_rejects_invalid_environment() {
    let temp_dir = TempDir::new().unwrap();
    let xml = write_file(temp_dir.path(), "doc.xml", "<doc/>");

    let output = xml_shape()
        .current_dir(temp_dir.path())
        .env("XML_SHAPE_RARELY_THRESHOLD", "often")
        .arg(&xml)
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("XML_SHAPE_RARELY_THRESHOLD"));
}
