//! Persist default import settings into a workspace.
//!
//! Settings given here are merged over whatever the workspace already
//! persists and written back, so later imports can run with just a workspace
//! and an array name.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use omicsds_lib::config::{ImportConfig, ImportKind};

use crate::commands::command::Command;

/// Persist import defaults for a workspace.
///
/// Takes the same options as `import`; every option given replaces the
/// persisted value, every option omitted leaves it untouched.
#[derive(Debug, Parser)]
#[command(
    name = "configure",
    about = "\x1b[38;5;173m[WORKSPACE]\x1b[0m    \x1b[36mPersist default import settings into a workspace\x1b[0m",
    long_about = r#"
Persist default import settings into a workspace.

The settings are stored as JSON inside the workspace directory and merged
under the command line of later `omicsds import` runs, so a configured
workspace can import with just --workspace and --array. Running configure
again updates only the options given; the rest keep their persisted values.

EXAMPLES:

  # Configure once...
  omicsds configure -w my_workspace --interval-level \
    -l files.list -s samples.map -m contigs.mapping

  # ...then import without repeating the inputs
  omicsds import -w my_workspace -a intervals
"#
)]
pub struct Configure {
    /// Path to the workspace directory.
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,

    /// Default to read-level imports (the file list should name SAM files).
    #[arg(
        short = 'r',
        long = "read-level",
        conflicts_with_all = ["interval_level", "feature_level"]
    )]
    pub read_level: bool,

    /// Default to interval-level imports (the file list should name BED
    /// files).
    #[arg(short = 'i', long = "interval-level", conflicts_with = "feature_level")]
    pub interval_level: bool,

    /// Default to feature-level imports (the file list should name matrix
    /// files).
    #[arg(short = 'f', long = "feature-level")]
    pub feature_level: bool,

    /// File containing the paths of the files to ingest, one per line.
    #[arg(short = 'l', long = "file-list")]
    pub file_list: Option<PathBuf>,

    /// File mapping sample names to array row indices.
    #[arg(short = 's', long = "sample-map")]
    pub sample_map: Option<PathBuf>,

    /// File mapping contig/offset pairs to flattened coordinates.
    #[arg(short = 'm', long = "mapping-file")]
    pub mapping_file: Option<PathBuf>,

    /// Store cells sample-major instead of the default position-major.
    #[arg(short = 'p', long = "sample-major")]
    pub sample_major: bool,
}

impl Configure {
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
}

impl Command for Configure {
    fn execute(&self, command_line: &str) -> Result<()> {
        info!("Command line: {command_line}");

        let update = ImportConfig {
            file_list: self.file_list.clone(),
            sample_map: self.sample_map.clone(),
            mapping_file: self.mapping_file.clone(),
            import_kind: self.import_kind(),
            sample_major: self.sample_major.then_some(true),
        };
        let persisted = ImportConfig::load(&self.workspace).with_context(|| {
            format!("reading configuration persisted in {}", self.workspace.display())
        })?;
        let merged = update.merge_over(persisted);
        merged.store(&self.workspace).with_context(|| {
            format!("writing configuration into {}", self.workspace.display())
        })?;

        info!("Updated import configuration for workspace {}", self.workspace.display());
        Ok(())
    }
}
