//! Integration tests for the consolidate command.

use std::process::Command;

use tempfile::TempDir;

use crate::helpers::{
    feature_level_inputs_with, fragment_count, import_feature_level, stored_cell_coords,
    GENE_10, GENE_5,
};

use omicsds_lib::config::{ImportConfig, ImportKind};
use omicsds_lib::loader::OmicsLoader;

/// Matrix whose columns arrive out of sample order, forcing the import to
/// split fragments.
const DISORDERED_MATRIX: &str = "\
SAMPLE\tS1\tS0
ENSG00000000005\t1.5\t2.5
ENSG00000000010\t3.5\t4.5
";

#[test]
fn test_consolidate_merges_split_fragments() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = feature_level_inputs_with(temp_dir.path(), DISORDERED_MATRIX);
    let workspace = temp_dir.path().join("ws");

    let config = ImportConfig {
        file_list: Some(inputs.file_list.clone()),
        sample_map: Some(inputs.sample_map.clone()),
        mapping_file: None,
        import_kind: Some(ImportKind::FeatureLevel),
        sample_major: None,
    }
    .resolve()
    .unwrap();
    OmicsLoader::new(&workspace, "features", &config).unwrap().import().unwrap();
    assert!(fragment_count(&workspace, "features") > 1, "Expected a fragment split");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "consolidate",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
        ])
        .status()
        .expect("Failed to run consolidate command");

    assert!(status.success(), "Consolidate command failed");
    assert_eq!(fragment_count(&workspace, "features"), 1);

    // The merged fragment keeps every cell in coordinate order
    let coords = stored_cell_coords(&workspace, "features");
    assert_eq!(
        coords,
        vec![[GENE_5, 0, 0], [GENE_5, 1, 0], [GENE_10, 0, 0], [GENE_10, 1, 0]]
    );
}

#[test]
fn test_consolidate_single_fragment_is_stable() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let workspace = import_feature_level(temp_dir.path());
    assert_eq!(fragment_count(&workspace, "features"), 1);
    let before = stored_cell_coords(&workspace, "features");

    let status = Command::new(env!("CARGO_BIN_EXE_omicsds"))
        .args([
            "consolidate",
            "-w",
            workspace.to_str().unwrap(),
            "-a",
            "features",
        ])
        .status()
        .expect("Failed to run consolidate command");

    assert!(status.success(), "Consolidate command failed");
    assert_eq!(fragment_count(&workspace, "features"), 1);
    assert_eq!(stored_cell_coords(&workspace, "features"), before);
}
