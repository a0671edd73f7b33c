//! Error path integration tests.
//!
//! These tests verify that misconfigured or malformed invocations fail with
//! a useful message instead of storing partial data.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

use crate::helpers::feature_level_inputs_with;

#[test]
fn test_import_without_kind_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = temp_dir.path().join("ws");

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args(["import", "-w", workspace.to_str().unwrap(), "-a", "features"])
        .output()
        .expect("Failed to run import command");

    assert!(!output.status.success(), "Import without a kind should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("import_kind"), "Unexpected error output: {stderr}");
}

#[test]
fn test_import_conflicting_kinds_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = temp_dir.path().join("ws");

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "arr",
            "-r",
            "-f",
        ])
        .output()
        .expect("Failed to run import command");

    assert!(!output.status.success(), "Conflicting kind flags should be rejected");
}

#[test]
fn test_import_unsorted_read_input_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    let workspace = dir.join("ws");

    fs::write(dir.join("contigs.mapping"), "chr1\t1000\t0\n").unwrap();
    fs::write(dir.join("samples.map"), "bad.sam\t0\n").unwrap();
    fs::write(
        dir.join("bad.sam"),
        "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:1000\n\
         late\t0\tchr1\t200\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
         early\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII\n",
    )
    .unwrap();
    fs::write(dir.join("files.list"), format!("{}\n", dir.join("bad.sam").to_string_lossy()))
        .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "reads",
            "-r",
            "-l",
            dir.join("files.list").to_str().unwrap(),
            "-s",
            dir.join("samples.map").to_str().unwrap(),
            "-m",
            dir.join("contigs.mapping").to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run import command");

    assert!(!output.status.success(), "Unsorted read input should abort the import");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("coordinate-sorted"), "Unexpected error output: {stderr}");
}

#[test]
fn test_import_ragged_matrix_row_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = feature_level_inputs_with(
        temp_dir.path(),
        "SAMPLE\tS0\tS1\nENSG00000000005\t1.5\t2.5\t9.9\n",
    );
    let workspace = temp_dir.path().join("ws");

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "-f",
            "-l",
            inputs.file_list.to_str().unwrap(),
            "-s",
            inputs.sample_map.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run import command");

    assert!(!output.status.success(), "Ragged matrix row should abort the import");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("expected 3 columns, found 4"),
        "Unexpected error output: {stderr}"
    );
}

#[test]
fn test_query_without_mode_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = temp_dir.path().join("ws");

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args(["query", "-w", workspace.to_str().unwrap(), "-a", "features"])
        .output()
        .expect("Failed to run query command");

    assert!(!output.status.success(), "Query without a mode should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("one of --generic, --export-matrix, or --export-sam"),
        "Unexpected error output: {stderr}"
    );
}

#[test]
fn test_query_conflicting_modes_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args(["query", "-w", "ws", "-a", "arr", "--generic", "--export-matrix"])
        .output()
        .expect("Failed to run query command");

    assert!(!output.status.success(), "Conflicting query modes should be rejected");
}

#[test]
fn test_query_missing_array_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "query",
            "-w",
            temp_dir.path().to_str().unwrap(),
            "-a",
            "no_such_array",
            "--generic",
        ])
        .output()
        .expect("Failed to run query command");

    assert!(!output.status.success(), "Query against a missing array should fail");
}

#[test]
fn test_consolidate_missing_array_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "consolidate",
            "-w",
            temp_dir.path().to_str().unwrap(),
            "-a",
            "no_such_array",
        ])
        .output()
        .expect("Failed to run consolidate command");

    assert!(!output.status.success(), "Consolidating a missing array should fail");
}
