//! Input readers that turn files into cells.
//!
//! Each import kind pairs a fixed schema with a reader: SAM files for
//! read-level imports, BED files for interval-level imports, and
//! feature-by-sample matrices for feature-level imports. Readers hand the
//! loader small batches of cells; the loader owns ordering and storage.

pub mod bed;
pub mod matrix;
pub mod sam;

use std::path::PathBuf;
use std::sync::Arc;

use log::warn;

use crate::cell::OmicsCell;
use crate::config::ImportKind;
use crate::errors::Result;
use crate::genomic_map::GenomicMap;
use crate::sample_map::SampleMap;
use crate::schema::{ArrayOrder, FieldInfo, FieldType, OmicsSchema};

pub use bed::BedCellReader;
pub use matrix::MatrixCellReader;
pub use sam::SamCellReader;

/// Source of cells for one input file.
///
/// `next_cells` returns the cells of the next record, or an empty vector at
/// end of input. Records that cannot produce cells (unparseable lines,
/// unmapped reads, unknown contigs) are logged and skipped inside the reader.
/// Read- and interval-level readers yield logical (sample, position)
/// coordinates; the matrix reader yields coordinates already in the array's
/// physical order.
pub trait CellReader {
    /// Cells of the next record, empty at end of input.
    fn next_cells(&mut self) -> Result<Vec<OmicsCell>>;
}

/// Builds the cell schema of an import kind.
#[must_use]
pub fn create_schema(
    kind: ImportKind,
    order: ArrayOrder,
    genomic_map: GenomicMap,
) -> OmicsSchema {
    let mut schema = OmicsSchema::new(order, genomic_map);
    let attributes: &[(&str, FieldInfo)] = match kind {
        ImportKind::ReadLevel => &[
            ("SAMPLE_NAME", FieldInfo::variable(FieldType::Char)),
            ("QNAME", FieldInfo::variable(FieldType::Char)),
            ("FLAG", FieldInfo::fixed(FieldType::UInt16, 1)),
            ("RNAME", FieldInfo::variable(FieldType::Char)),
            ("POS", FieldInfo::fixed(FieldType::Int32, 1)),
            ("MAPQ", FieldInfo::fixed(FieldType::UInt8, 1)),
            ("CIGAR", FieldInfo::variable(FieldType::UInt32)),
            ("RNEXT", FieldInfo::fixed(FieldType::Int32, 1)),
            ("PNEXT", FieldInfo::fixed(FieldType::Int32, 1)),
            ("TLEN", FieldInfo::fixed(FieldType::Int32, 1)),
            ("SEQ", FieldInfo::variable(FieldType::Char)),
            ("QUAL", FieldInfo::variable(FieldType::Char)),
        ],
        ImportKind::IntervalLevel => &[
            ("CHROM", FieldInfo::variable(FieldType::Char)),
            ("START", FieldInfo::fixed(FieldType::UInt64, 1)),
            ("END", FieldInfo::fixed(FieldType::UInt64, 1)),
            ("SCORE", FieldInfo::fixed(FieldType::Float, 1)),
            ("SAMPLE_NAME", FieldInfo::variable(FieldType::Char)),
            ("NAME", FieldInfo::variable(FieldType::Char)),
        ],
        ImportKind::FeatureLevel => &[("SCORE", FieldInfo::fixed(FieldType::Float, 1))],
    };
    for (name, info) in attributes {
        schema.attributes.insert((*name).to_string(), *info);
    }
    schema
}

/// Opens one reader per matching input file.
///
/// Read-level imports take `.sam` files and interval-level imports take
/// `.bed` files; other entries in the file list are logged and skipped.
/// Feature-level imports treat every entry as a matrix.
pub fn open_readers(
    kind: ImportKind,
    files: &[PathBuf],
    schema: &Arc<OmicsSchema>,
    sample_map: &SampleMap,
) -> Result<Vec<Box<dyn CellReader>>> {
    let mut readers: Vec<Box<dyn CellReader>> = Vec::new();
    for path in files {
        let name = path.to_string_lossy();
        match kind {
            ImportKind::ReadLevel if name.ends_with(".sam") => {
                let file_idx = readers.len();
                readers.push(Box::new(SamCellReader::new(
                    path,
                    file_idx,
                    Arc::clone(schema),
                    sample_map,
                )?));
            }
            ImportKind::IntervalLevel if name.ends_with(".bed") => {
                let file_idx = readers.len();
                readers.push(Box::new(BedCellReader::new(
                    path,
                    file_idx,
                    Arc::clone(schema),
                    sample_map,
                )?));
            }
            ImportKind::FeatureLevel => {
                let file_idx = readers.len();
                readers.push(Box::new(MatrixCellReader::new(
                    path,
                    file_idx,
                    Arc::clone(schema),
                    sample_map,
                )?));
            }
            _ => warn!("Skipping input '{name}': not a {} file", kind.as_str()),
        }
    }
    Ok(readers)
}
