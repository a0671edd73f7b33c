//! Integration tests for the query command's three export modes.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

use crate::helpers::{import_feature_level, import_interval_level, import_read_level};

#[test]
fn test_query_matrix_reproduces_imported_scores() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_feature_level(temp_dir.path());
    let output = temp_dir.path().join("scores.tsv");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "--export-matrix",
            "--sample-map",
            temp_dir.path().join("samples.map").to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run query command");

    assert!(status.success(), "Query command failed");

    // Same layout as the imported matrix, with scores widened to six decimals
    let matrix = fs::read_to_string(&output).expect("Matrix output not created");
    assert_eq!(
        matrix,
        "SAMPLE\tS0\tS1\n\
         ENSG00000000005.7\t1.500000\t2.500000\n\
         ENSG00000000010\t3.500000\t4.500000\n"
    );
}

#[test]
fn test_query_matrix_writes_numeric_columns_to_stdout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_feature_level(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "-m",
        ])
        .output()
        .expect("Failed to run query command");

    assert!(output.status.success(), "Query command failed");

    // Without a sample map, columns fall back to raw row numbers; logging
    // goes to stderr so stdout holds the matrix alone
    let stdout = String::from_utf8(output.stdout).expect("Matrix output not UTF-8");
    assert_eq!(
        stdout,
        "SAMPLE\t0\t1\n\
         ENSG00000000005.7\t1.500000\t2.500000\n\
         ENSG00000000010\t3.500000\t4.500000\n"
    );
}

#[test]
fn test_query_matrix_feature_subset() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_feature_level(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "-m",
            "--features",
            "ENSG00000000010",
        ])
        .output()
        .expect("Failed to run query command");

    assert!(output.status.success(), "Query command failed");
    let stdout = String::from_utf8(output.stdout).expect("Matrix output not UTF-8");
    assert_eq!(stdout, "SAMPLE\t0\t1\nENSG00000000010\t3.500000\t4.500000\n");
}

#[test]
fn test_query_matrix_sample_range_drops_columns() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_feature_level(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "-m",
            "--sample-range",
            "1",
            "1",
        ])
        .output()
        .expect("Failed to run query command");

    assert!(output.status.success(), "Query command failed");
    let stdout = String::from_utf8(output.stdout).expect("Matrix output not UTF-8");
    assert_eq!(
        stdout,
        "SAMPLE\t1\n\
         ENSG00000000005.7\t2.500000\n\
         ENSG00000000010\t4.500000\n"
    );
}

#[test]
fn test_query_generic_logs_feature_lines() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_interval_level(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "intervals",
            "--generic",
        ])
        .output()
        .expect("Failed to run query command");

    assert!(output.status.success(), "Query command failed");

    // Positions pass through the feature decoder, so interval coordinates
    // come out dressed as transcript ids
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Feature id=ENST00000000005, Sample id=0"));
    assert!(stderr.contains("Feature id=ENST00000000010, Sample id=0"));
}

#[test]
fn test_query_sam_export_writes_one_file_per_sample() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_read_level(temp_dir.path());
    let prefix = temp_dir.path().join("exported_").to_string_lossy().to_string();

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "reads",
            "--export-sam",
            "--output-prefix",
            &prefix,
        ])
        .status()
        .expect("Failed to run query command");

    assert!(status.success(), "Query command failed");

    // read1 is paired so it lands at both template ends
    let sample0 = fs::read_to_string(format!("{prefix}0.sam")).expect("Missing sample 0");
    let lines: Vec<&str> = sample0.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "read1\t99\tchr1\t100\t60\t4M\t0\t150\t54\tACGT\tIIII");
    assert_eq!(lines[1], "read1\t99\tchr1\t100\t60\t4M\t0\t150\t54\tACGT\tIIII");
    assert_eq!(lines[2], "read3\t0\tchr1\t200\t60\t2M2S\t-1\t0\t0\tACGT\tIIII");

    let sample1 = fs::read_to_string(format!("{prefix}1.sam")).expect("Missing sample 1");
    assert_eq!(sample1, "read2\t0\tchr1\t150\t30\t4M\t-1\t0\t0\tTTTT\tJJJJ\n");
}

#[test]
fn test_query_sam_export_honors_sample_range() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_read_level(temp_dir.path());
    let prefix = temp_dir.path().join("ranged_").to_string_lossy().to_string();

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "reads",
            "-e",
            "--output-prefix",
            &prefix,
            "--sample-range",
            "1",
            "1",
        ])
        .status()
        .expect("Failed to run query command");

    assert!(status.success(), "Query command failed");

    // Output files appear only for sample rows the range visits
    assert!(!std::path::Path::new(&format!("{prefix}0.sam")).exists());
    let sample1 = fs::read_to_string(format!("{prefix}1.sam")).expect("Missing sample 1");
    assert!(sample1.starts_with("read2\t"));
}
