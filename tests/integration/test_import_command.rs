//! Integration tests for the import command.

use std::process::Command;

use tempfile::TempDir;

use crate::helpers::{
    feature_level_inputs, feature_level_inputs_with, interval_level_inputs,
    read_level_inputs, stored_cell_coords, GENE_10, GENE_5, MATRIX_TRANSPOSED,
};

#[test]
fn test_import_read_level_stores_both_template_ends() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = read_level_inputs(temp_dir.path());
    let workspace = temp_dir.path().join("ws");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "--workspace",
            workspace.to_str().unwrap(),
            "--array",
            "reads",
            "--read-level",
            "--file-list",
            inputs.file_list.to_str().unwrap(),
            "--sample-map",
            inputs.sample_map.to_str().unwrap(),
            "--mapping-file",
            inputs.mapping_file.as_ref().unwrap().to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run import command");

    assert!(status.success(), "Import command failed");

    // Position-major coordinates, flattened to 0-based offsets: the paired
    // read1 stores a cell at its start (99) and its template end (152)
    let coords = stored_cell_coords(&workspace, "reads");
    assert_eq!(coords, vec![[99, 0, 0], [149, 1, 0], [152, 0, 0], [199, 0, 0]]);
}

#[test]
fn test_import_interval_level_assigns_write_order_levels() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = interval_level_inputs(temp_dir.path());
    let workspace = temp_dir.path().join("ws");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "intervals",
            "-i",
            "-l",
            inputs.file_list.to_str().unwrap(),
            "-s",
            inputs.sample_map.to_str().unwrap(),
            "-m",
            inputs.mapping_file.as_ref().unwrap().to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run import command");

    assert!(status.success(), "Import command failed");

    // The duplicate cells at position 10 stack by write order
    let coords = stored_cell_coords(&workspace, "intervals");
    assert_eq!(coords, vec![[5, 0, 0], [10, 0, 0], [10, 0, 1]]);
}

#[test]
fn test_import_feature_level_position_major_layout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = feature_level_inputs(temp_dir.path());
    let workspace = temp_dir.path().join("ws");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
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
        .status()
        .expect("Failed to run import command");

    assert!(status.success(), "Import command failed");

    // Feature keys lead, the version byte rides in the level slot
    let coords = stored_cell_coords(&workspace, "features");
    assert_eq!(
        coords,
        vec![[GENE_5, 0, 7], [GENE_5, 1, 7], [GENE_10, 0, 0], [GENE_10, 1, 0]]
    );
}

#[test]
fn test_import_feature_level_sample_major_layout() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    // Sample-major arrays ingest the transposed, GENE-headed orientation
    let inputs = feature_level_inputs_with(temp_dir.path(), MATRIX_TRANSPOSED);
    let workspace = temp_dir.path().join("ws");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "-f",
            "-p",
            "-l",
            inputs.file_list.to_str().unwrap(),
            "-s",
            inputs.sample_map.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run import command");

    assert!(status.success(), "Import command failed");

    // Sample rows lead, features follow within each row
    let coords = stored_cell_coords(&workspace, "features");
    assert_eq!(
        coords,
        vec![[0, GENE_5, 7], [0, GENE_10, 0], [1, GENE_5, 7], [1, GENE_10, 0]]
    );
}
