//! Utilities for generating workspace inputs programmatically.
//!
//! Each builder writes a self-contained input set (data files, sample map,
//! file list, and contig mapping where the kind needs one) into a fixture
//! directory, so tests can point the binary or the loader at real files.

#![allow(dead_code)]

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use omicsds_lib::config::{ImportConfig, ImportKind};
use omicsds_lib::loader::OmicsLoader;
use omicsds_lib::storage::{full_subarray, ArrayStorage, FileArray, StorageMode};

/// Two-sample SAM inputs. `read1` is paired so it stores a cell at both
/// template ends, `read3` is a lone mapped read, and `read2` belongs to the
/// second sample.
pub const SAM_A: &str = "\
@HD\tVN:1.6
@SQ\tSN:chr1\tLN:1000
read1\t99\tchr1\t100\t60\t4M\t=\t150\t54\tACGT\tIIII
read3\t0\tchr1\t200\t60\t2M2S\t*\t0\t0\tACGT\tIIII
";

pub const SAM_B: &str = "\
@HD\tVN:1.6
@SQ\tSN:chr1\tLN:1000
read2\t0\tchr1\t150\t30\t4M\t*\t0\t0\tTTTT\tJJJJ
";

/// Interval inputs for one sample with a duplicated position across files.
pub const BED_ONE: &str = "track description=\"S0\"\nchr1\t5\t5\tr1\t1.0\n";
pub const BED_TWO: &str =
    "track description=\"S0\"\nchr1\t10\t10\tr2\t2.0\nchr1\t10\t10\tr3\t3.0\n";

/// Feature-by-sample score matrix over two genes, one carrying a version.
pub const MATRIX: &str = "\
SAMPLE\tS0\tS1
ENSG00000000005.7\t1.5\t2.5
ENSG00000000010\t3.5\t4.5
";

/// The same scores transposed, as a sample-major array ingests them.
pub const MATRIX_TRANSPOSED: &str = "\
GENE\tENSG00000000005.7\tENSG00000000010
S0\t1.5\t3.5
S1\t2.5\t4.5
";

/// Key of `ENSG00000000005` in the feature dimension.
pub const GENE_5: i64 = 1_i64 << 48 | 5;
/// Key of `ENSG00000000010` in the feature dimension.
pub const GENE_10: i64 = 1_i64 << 48 | 10;

/// Input paths an import consumes, as written into a fixture directory.
pub struct ImportInputs {
    pub file_list: PathBuf,
    pub sample_map: PathBuf,
    pub mapping_file: Option<PathBuf>,
}

/// Writes the read-level fixture. The sample map keys SAM inputs by file
/// name.
pub fn read_level_inputs(dir: &Path) -> ImportInputs {
    fs::write(dir.join("contigs.mapping"), "chr1\t1000\t0\n").unwrap();
    fs::write(dir.join("samples.map"), "a.sam\t0\nb.sam\t1\n").unwrap();
    fs::write(dir.join("a.sam"), SAM_A).unwrap();
    fs::write(dir.join("b.sam"), SAM_B).unwrap();
    write_file_list(dir, &["a.sam", "b.sam"]);
    ImportInputs {
        file_list: dir.join("files.list"),
        sample_map: dir.join("samples.map"),
        mapping_file: Some(dir.join("contigs.mapping")),
    }
}

/// Writes the interval-level fixture. BED inputs carry their sample name in
/// the track description line.
pub fn interval_level_inputs(dir: &Path) -> ImportInputs {
    fs::write(dir.join("contigs.mapping"), "chr1\t1000000\t0\n").unwrap();
    fs::write(dir.join("samples.map"), "S0\t0\n").unwrap();
    fs::write(dir.join("one.bed"), BED_ONE).unwrap();
    fs::write(dir.join("two.bed"), BED_TWO).unwrap();
    write_file_list(dir, &["one.bed", "two.bed"]);
    ImportInputs {
        file_list: dir.join("files.list"),
        sample_map: dir.join("samples.map"),
        mapping_file: Some(dir.join("contigs.mapping")),
    }
}

/// Writes the feature-level fixture; matrices need no contig mapping.
pub fn feature_level_inputs(dir: &Path) -> ImportInputs {
    feature_level_inputs_with(dir, MATRIX)
}

/// Writes a feature-level fixture around a caller-supplied matrix.
pub fn feature_level_inputs_with(dir: &Path, matrix: &str) -> ImportInputs {
    fs::write(dir.join("samples.map"), "S0\t0\nS1\t1\n").unwrap();
    fs::write(dir.join("scores.resort"), matrix).unwrap();
    write_file_list(dir, &["scores.resort"]);
    ImportInputs {
        file_list: dir.join("files.list"),
        sample_map: dir.join("samples.map"),
        mapping_file: None,
    }
}

fn write_file_list(dir: &Path, names: &[&str]) {
    let mut list = String::new();
    for name in names {
        list.push_str(&dir.join(name).to_string_lossy());
        list.push('\n');
    }
    fs::write(dir.join("files.list"), list).unwrap();
}

fn import(dir: &Path, inputs: &ImportInputs, kind: ImportKind, array: &str) -> PathBuf {
    let config = ImportConfig {
        file_list: Some(inputs.file_list.clone()),
        sample_map: Some(inputs.sample_map.clone()),
        mapping_file: inputs.mapping_file.clone(),
        import_kind: Some(kind),
        sample_major: None,
    }
    .resolve()
    .unwrap();
    let workspace = dir.join("ws");
    OmicsLoader::new(&workspace, array, &config).unwrap().import().unwrap();
    workspace
}

/// Imports the read-level fixture into `ws/reads` and returns the workspace.
pub fn import_read_level(dir: &Path) -> PathBuf {
    let inputs = read_level_inputs(dir);
    import(dir, &inputs, ImportKind::ReadLevel, "reads")
}

/// Imports the interval fixture into `ws/intervals` and returns the
/// workspace.
pub fn import_interval_level(dir: &Path) -> PathBuf {
    let inputs = interval_level_inputs(dir);
    import(dir, &inputs, ImportKind::IntervalLevel, "intervals")
}

/// Imports the matrix fixture into `ws/features` and returns the workspace.
pub fn import_feature_level(dir: &Path) -> PathBuf {
    let inputs = feature_level_inputs(dir);
    import(dir, &inputs, ImportKind::FeatureLevel, "features")
}

/// Physical coordinates of every stored cell, in merged retrieval order.
pub fn stored_cell_coords(workspace: &Path, array: &str) -> Vec<[i64; 3]> {
    let mut storage = FileArray::new(workspace, array);
    storage.initialize(StorageMode::Read, None, false, false).unwrap();
    let mut coords = Vec::new();
    storage
        .retrieve_by_cell(&full_subarray(), &mut |c, _| {
            coords.push(*c);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
    coords
}

/// Number of fragment files in an array directory.
pub fn fragment_count(workspace: &Path, array: &str) -> usize {
    fs::read_dir(workspace.join(array))
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("fragment_")
        })
        .count()
}
