//! Import omics files into a sorted columnar array.
//!
//! Reads every input in the file list, merges their cells into one globally
//! sorted stream, and stores the stream as a new array in the workspace. The
//! three import kinds cover SAM alignments (read-level), BED intervals
//! (interval-level), and feature-by-sample score matrices (feature-level).
//!
//! Options left unset fall back to defaults persisted in the workspace with
//! `omicsds configure`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use omicsds_lib::config::{ImportConfig, ImportKind};
use omicsds_lib::loader::OmicsLoader;
use omicsds_lib::logging::format_count;

use crate::commands::command::Command;

/// Import omics data into a workspace array.
///
/// Exactly one import kind applies per array; the kind, the inputs, and the
/// storage order can come from the command line or from the workspace's
/// persisted configuration.
#[derive(Debug, Parser)]
#[command(
    name = "import",
    about = "\x1b[38;5;72m[INGEST]\x1b[0m       \x1b[36mImport SAM, BED, or matrix files into a sorted array\x1b[0m",
    long_about = r#"
Import omics data files into a sorted columnar array.

Every input named in the file list is read through a format-specific reader
and merged into one globally sorted cell stream, which is packed into
columnar buffers and stored under <workspace>/<array>.

IMPORT KINDS:

  --read-level        The file list names SAM files. Each alignment becomes a
                      start cell and, when TLEN is nonzero, an end cell.
                      Requires --mapping-file.

  --interval-level    The file list names BED files. Each scored interval
                      becomes a start and an end cell. Requires
                      --mapping-file.

  --feature-level     The file list names score matrix files. Each
                      (feature, sample) score becomes one cell; feature ids
                      are packed into integer keys.

Options omitted here fall back to values persisted in the workspace by
`omicsds configure`, so a configured workspace can import with just
--workspace and --array.

EXAMPLES:

  # Import BED intervals
  omicsds import -w my_workspace -a intervals --interval-level \
    -l files.list -s samples.map -m contigs.mapping

  # Import a score matrix into a configured workspace
  omicsds import -w my_workspace -a features --feature-level -l files.list

  # Store sample-major instead of the default position-major
  omicsds import -w my_workspace -a reads --read-level \
    -l files.list -s samples.map -m contigs.mapping --sample-major
"#
)]
pub struct Import {
    /// Path to the workspace directory.
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,

    /// Name of the array (should not include the path to the workspace).
    #[arg(short = 'a', long = "array")]
    pub array: String,

    /// Ingest read-level data (the file list should name SAM files).
    #[arg(
        short = 'r',
        long = "read-level",
        conflicts_with_all = ["interval_level", "feature_level"]
    )]
    pub read_level: bool,

    /// Ingest interval-level data (the file list should name BED files).
    #[arg(short = 'i', long = "interval-level", conflicts_with = "feature_level")]
    pub interval_level: bool,

    /// Ingest feature-level data (the file list should name matrix files).
    #[arg(short = 'f', long = "feature-level")]
    pub feature_level: bool,

    /// File containing the paths of the files to ingest, one per line.
    #[arg(short = 'l', long = "file-list")]
    pub file_list: Option<PathBuf>,

    /// File mapping sample names to array row indices (each line is a sample
    /// name and an integer row number separated by a tab).
    #[arg(short = 's', long = "sample-map")]
    pub sample_map: Option<PathBuf>,

    /// File mapping contig/offset pairs to flattened coordinates; the first
    /// three columns of a fasta.fai work (contig name, length, and starting
    /// offset separated by tabs). Not needed for feature-level data.
    #[arg(short = 'm', long = "mapping-file")]
    pub mapping_file: Option<PathBuf>,

    /// Store cells sample-major instead of the default position-major.
    #[arg(short = 'p', long = "sample-major")]
    pub sample_major: bool,
}

impl Import {
    fn import_kind(&self) -> Option<ImportKind> {
        if self.read_level {
            Some(ImportKind::ReadLevel)
        } else if self.interval_level {
            Some(ImportKind::IntervalLevel)
        } else if self.feature_level {
            Some(ImportKind::FeatureLevel)
        } else {
            None
        }
    }

    /// The settings given on this command line, with unset fields open for
    /// workspace defaults.
    fn cli_config(&self) -> ImportConfig {
        ImportConfig {
            file_list: self.file_list.clone(),
            sample_map: self.sample_map.clone(),
            mapping_file: self.mapping_file.clone(),
            import_kind: self.import_kind(),
            sample_major: self.sample_major.then_some(true),
        }
    }
}

impl Command for Import {
    fn execute(&self, command_line: &str) -> Result<()> {
        info!("Command line: {command_line}");

        let persisted = ImportConfig::load(&self.workspace).with_context(|| {
            format!("reading configuration persisted in {}", self.workspace.display())
        })?;
        let config = self.cli_config().merge_over(persisted).resolve().with_context(|| {
            format!(
                "import into array '{}' of workspace {} is not fully configured",
                self.array,
                self.workspace.display()
            )
        })?;

        info!("Importing {} data into array '{}'", config.kind.as_str(), self.array);
        let loader = OmicsLoader::new(&self.workspace, &self.array, &config)?;
        let cells = loader.import()?;
        info!("Import stored {} cells", format_count(cells));
        Ok(())
    }
}
