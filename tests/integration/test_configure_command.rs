//! Integration tests for the configure command and persisted import
//! settings.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

use crate::helpers::{feature_level_inputs, stored_cell_coords, GENE_10, GENE_5};

#[test]
fn test_configure_persists_settings_for_later_imports() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = feature_level_inputs(temp_dir.path());
    let workspace = temp_dir.path().join("ws");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "configure",
            "-w",
            workspace.to_str().unwrap(),
            "-f",
            "-l",
            inputs.file_list.to_str().unwrap(),
            "-s",
            inputs.sample_map.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run configure command");

    assert!(status.success(), "Configure command failed");

    let config_file = workspace.join("omicsds_import_config");
    let persisted = fs::read_to_string(&config_file).expect("Config file not created");
    assert!(persisted.contains("FEATURE"), "Import kind not persisted: {persisted}");

    // A bare import picks everything up from the workspace
    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args(["import", "-w", workspace.to_str().unwrap(), "-a", "features"])
        .status()
        .expect("Failed to run import command");

    assert!(status.success(), "Import from persisted config failed");
    let coords = stored_cell_coords(&workspace, "features");
    assert_eq!(
        coords,
        vec![[GENE_5, 0, 7], [GENE_5, 1, 7], [GENE_10, 0, 0], [GENE_10, 1, 0]]
    );
}

#[test]
fn test_configure_updates_merge_over_existing_settings() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = feature_level_inputs(temp_dir.path());
    let workspace = temp_dir.path().join("ws");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "configure",
            "-w",
            workspace.to_str().unwrap(),
            "-f",
            "-l",
            inputs.file_list.to_str().unwrap(),
            "-s",
            inputs.sample_map.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run configure command");
    assert!(status.success());

    // A second configure touching one option keeps the others
    let other_list = temp_dir.path().join("other.list");
    fs::write(&other_list, "").unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "configure",
            "-w",
            workspace.to_str().unwrap(),
            "-l",
            other_list.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run configure command");
    assert!(status.success());

    let persisted =
        fs::read_to_string(workspace.join("omicsds_import_config")).expect("Config missing");
    assert!(persisted.contains("other.list"), "Updated file list not persisted");
    assert!(persisted.contains("FEATURE"), "Earlier import kind lost: {persisted}");
    assert!(persisted.contains("samples.map"), "Earlier sample map lost: {persisted}");
}

#[test]
fn test_import_flags_override_persisted_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = feature_level_inputs(temp_dir.path());
    let workspace = temp_dir.path().join("ws");

    // Persist an empty file list, then point the import at the real one
    let empty_list = temp_dir.path().join("empty.list");
    fs::write(&empty_list, "").unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "configure",
            "-w",
            workspace.to_str().unwrap(),
            "-f",
            "-l",
            empty_list.to_str().unwrap(),
            "-s",
            inputs.sample_map.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run configure command");
    assert!(status.success());

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "import",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
            "-l",
            inputs.file_list.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run import command");

    assert!(status.success(), "Import with overriding file list failed");
    assert_eq!(stored_cell_coords(&workspace, "features").len(), 4);
}
