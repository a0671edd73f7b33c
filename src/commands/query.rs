//! Query a stored array: generic cell dumps, matrix export, SAM export.
//!
//! Generic queries and matrix exports go through the handle API and its
//! feature query planner; SAM export opens the array directly and writes one
//! file per sample row.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fgoxide::io::Io;
use log::info;
use omicsds_lib::api::{self, OmicsHandle};
use omicsds_lib::export::{MatrixWriter, SamExporter};
use omicsds_lib::sample_map::SampleMap;

use crate::commands::command::Command;

/// Query data back out of a workspace array.
///
/// Exactly one query mode applies: `--generic` prints cell summaries,
/// `--export-matrix` regenerates a score matrix from a feature-level array,
/// and `--export-sam` regenerates per-sample SAM files from a read-level
/// array.
#[derive(Debug, Parser)]
#[command(
    name = "query",
    about = "\x1b[38;5;110m[QUERY]\x1b[0m        \x1b[36mExport cells, score matrices, or SAM files from an array\x1b[0m",
    long_about = r#"
Query data back out of a workspace array.

QUERY MODES:

  --generic           Log each matching cell as feature id, sample row, and
                      score. Works on any array; mostly useful for inspection.

  --export-matrix     Regenerate a tab-separated score matrix (SAMPLE header
                      row, one row per feature) from a feature-level array.
                      Writes to stdout unless --output is given; with
                      --sample-map, columns are labeled with sample names
                      instead of row numbers.

  --export-sam        Regenerate SAM files from a read-level array, one file
                      per sample row, named <prefix><row>.sam.

--features restricts a generic or matrix query to specific feature ids;
--sample-range restricts any mode to an inclusive sample row range.

EXAMPLES:

  # Dump every cell of an array
  omicsds query -w my_workspace -a intervals --generic

  # Regenerate a matrix with named columns
  omicsds query -w my_workspace -a features --export-matrix \
    -s samples.map -o scores.tsv

  # Matrix restricted to two features
  omicsds query -w my_workspace -a features --export-matrix \
    --features ENSG00000000005 --features ENSG00000000010

  # SAM files for sample rows 0 through 3
  omicsds query -w my_workspace -a reads --export-sam \
    --sample-range 0 3 --output-prefix exported_
"#
)]
pub struct Query {
    /// Path to the workspace directory.
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,

    /// Name of the array (should not include the path to the workspace).
    #[arg(short = 'a', long = "array")]
    pub array: String,

    /// Log each matching cell's feature id, sample row, and score.
    #[arg(
        short = 'g',
        long = "generic",
        conflicts_with_all = ["export_matrix", "export_sam"]
    )]
    pub generic: bool,

    /// Regenerate a score matrix from a feature-level array.
    #[arg(short = 'm', long = "export-matrix", conflicts_with = "export_sam")]
    pub export_matrix: bool,

    /// Regenerate per-sample SAM files from a read-level array.
    #[arg(short = 'e', long = "export-sam")]
    pub export_sam: bool,

    /// Sample map for labeling matrix columns with sample names rather than
    /// row numbers.
    #[arg(short = 's', long = "sample-map", requires = "export_matrix")]
    pub sample_map: Option<PathBuf>,

    /// Write the matrix to this file instead of stdout.
    #[arg(short = 'o', long = "output", requires = "export_matrix")]
    pub output: Option<PathBuf>,

    /// Prefix for exported SAM files; the sample row and ".sam" are appended.
    #[arg(long = "output-prefix", default_value = "sam_output")]
    pub output_prefix: String,

    /// Feature id to query (repeat the flag per id); all features when
    /// omitted.
    #[arg(long = "features", value_name = "ID")]
    pub features: Vec<String>,

    /// Inclusive sample row range to query; a negative bound lifts the
    /// constraint.
    #[arg(
        long = "sample-range",
        num_args = 2,
        value_names = ["LO", "HI"],
        allow_negative_numbers = true
    )]
    pub sample_range: Option<Vec<i64>>,
}

impl Query {
    fn run_query(&self, handle: OmicsHandle, sample_range: [i64; 2]) -> Result<()> {
        if self.generic {
            api::query_features(handle, &self.features, sample_range, None)?;
            return Ok(());
        }

        let writer: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(
                Io::default()
                    .new_writer(path)
                    .with_context(|| format!("creating {}", path.display()))?,
            ),
            None => Box::new(std::io::stdout().lock()),
        };
        let mut matrix = MatrixWriter::new(writer);
        if let Some(path) = &self.sample_map {
            matrix = matrix.with_inverse_sample_map(SampleMap::from_file(path)?.invert());
        }

        let mut processor =
            |feature: &str, sample: u64, score: f32| matrix.process(feature, sample, score);
        api::query_features(handle, &self.features, sample_range, Some(&mut processor))?;
        matrix.finish()?;
        Ok(())
    }
}

impl Command for Query {
    fn execute(&self, command_line: &str) -> Result<()> {
        info!("Command line: {command_line}");
        let sample_range = self.sample_range.as_ref().map_or([0, i64::MAX], |r| [r[0], r[1]]);

        if self.export_matrix || self.generic {
            let handle = api::connect(&self.workspace, &self.array)?;
            let result = self.run_query(handle, sample_range);
            api::disconnect(handle);
            result
        } else if self.export_sam {
            let mut exporter = SamExporter::new(&self.workspace, &self.array)?;
            exporter.export_sams(sample_range, [0, i64::MAX], &self.output_prefix)?;
            Ok(())
        } else {
            bail!("one of --generic, --export-matrix, or --export-sam must be specified");
        }
    }
}
