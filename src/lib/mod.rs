#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Coordinate and key arithmetic intentionally casts between numeric types
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
// - items_after_statements: Some test code uses late item declarations
// - match_same_arms: Sometimes clearer to list arms explicitly
// - unnecessary_wraps: Some Result returns are for API consistency
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::unnecessary_wraps,
    clippy::too_many_lines,
    clippy::map_unwrap_or,
    clippy::uninlined_format_args
)]

//! # omicsds - Omics Data Store Library
//!
//! This library stores sample-by-position omics data in sorted columnar
//! arrays: read-level alignments, interval-level signals, and feature-level
//! score matrices all share one coordinate model, one import engine, and one
//! query path.
//!
//! ## Overview
//!
//! The omicsds library is organized into several key modules:
//!
//! ### Core Functionality
//!
//! - **[`loader`]** - Merge-sort import engine feeding sorted cells into storage
//! - **[`export`]** - Range queries plus SAM and score-matrix regeneration
//! - **[`api`]** - Handle-based query sessions for feature-level arrays
//! - **[`storage`]** - Columnar array backend with fragments and consolidation
//!
//! ### Data Model
//!
//! - **[`schema`]** - Attribute schemas and physical coordinate order
//! - **[`cell`]** - Cells and typed field payloads
//! - **[`encoder`]** - Feature id to integer key codec
//! - **[`genomic_map`]** - Contig offsets and position flattening
//! - **[`gene_map`]** - Gene and transcript interval maps (gtf/gi/gbed)
//! - **[`sample_map`]** - Sample name to array row assignments
//! - **[`metadata`]** - Persisted per-array coordinate extents
//!
//! ### Utilities
//!
//! - **[`readers`]** - Per-format input readers (SAM, BED, score matrix)
//! - **[`config`]** - Import configuration, persisted per workspace
//! - **[`progress`]** - Progress tracking and logging
//! - **[`logging`]** - Enhanced logging utilities with formatting
//! - **[`errors`]** - Error taxonomy shared across all modules
//!
//! ## Quick Start
//!
//! ### Importing Interval Data
//!
//! ```no_run
//! use omicsds_lib::config::{ImportConfig, ImportKind};
//! use omicsds_lib::loader::OmicsLoader;
//!
//! # fn main() -> omicsds_lib::errors::Result<()> {
//! let config = ImportConfig {
//!     file_list: Some("files.list".into()),
//!     sample_map: Some("samples.map".into()),
//!     mapping_file: Some("contigs.mapping".into()),
//!     import_kind: Some(ImportKind::IntervalLevel),
//!     sample_major: None,
//! }
//! .resolve()?;
//!
//! let loader = OmicsLoader::new("workspace", "intervals", &config)?;
//! loader.import()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Querying Feature Scores
//!
//! ```no_run
//! use omicsds_lib::api;
//!
//! # fn main() -> omicsds_lib::errors::Result<()> {
//! let handle = api::connect("workspace", "features")?;
//! // Empty feature set queries every feature; scores go to the log
//! api::query_features(handle, &[], [0, i64::MAX], None)?;
//! api::disconnect(handle);
//! # Ok(())
//! # }
//! ```
//!
//! ### Regenerating SAM Files
//!
//! ```no_run
//! use omicsds_lib::export::SamExporter;
//!
//! # fn main() -> omicsds_lib::errors::Result<()> {
//! let mut exporter = SamExporter::new("workspace", "reads")?;
//! // One file per sample row: sample_0.sam, sample_1.sam, ...
//! exporter.export_sams([0, i64::MAX], [0, i64::MAX], "sample_")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Encoding Feature Ids
//!
//! ```
//! use omicsds_lib::encoder::FeatureEncoder;
//!
//! let mut encoder = FeatureEncoder::new();
//! let (key, version) = encoder.encode("ENST00000456328.1");
//! assert_eq!(encoder.decode(key, version).unwrap(), "ENST00000456328.1");
//! ```

pub mod api;
pub mod cell;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod export;
pub mod gene_map;
pub mod genomic_map;
pub mod loader;
pub mod logging;
pub mod metadata;
pub mod progress;
pub mod readers;
pub mod sample_map;
pub mod schema;
pub mod storage;

// Re-export the error type every module returns
pub use errors::{OmicsError, Result};

// Re-export the import and export entry points for convenient access
pub use export::{MatrixWriter, OmicsExporter, SamExporter};
pub use loader::OmicsLoader;
