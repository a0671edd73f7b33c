//! Range queries over a stored array.
//!
//! An exporter opens an array read-only and replays stored cells against an
//! inclusive (sample, position) range. Cells stream back in physical order;
//! their coordinates are swapped to canonical (sample, position, level) order
//! before reaching the caller, so downstream consumers never see the array's
//! storage order. Specialized exporters sit on top: one regenerating SAM
//! files, one regenerating score matrices.

pub mod matrix;
pub mod sam;

use std::io::Write;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use crate::cell::FieldData;
use crate::errors::{OmicsError, Result};
use crate::schema::{FieldInfo, OmicsSchema};
use crate::storage::{ArrayStorage, FileArray, StorageMode, COORDS_PER_CELL};

pub use matrix::MatrixWriter;
pub use sam::SamExporter;

/// Callback invoked once per queried cell with canonical (sample, position,
/// level) coordinates and the cell's payloads in schema attribute order.
/// Returning `ControlFlow::Break` ends the query early.
pub type ExportProcessor<'a> =
    dyn FnMut(&[i64; COORDS_PER_CELL], &[FieldData]) -> Result<ControlFlow<()>> + 'a;

/// Read-only view of one array.
pub struct OmicsExporter {
    storage: Box<dyn ArrayStorage + Send>,
    schema: Arc<OmicsSchema>,
}

impl OmicsExporter {
    /// Opens `array` under `workspace` and loads its persisted schema.
    ///
    /// # Errors
    /// Fails when the array does not exist or its schema cannot be read.
    pub fn new<P: AsRef<Path>>(workspace: P, array: &str) -> Result<Self> {
        let mut storage: Box<dyn ArrayStorage + Send> = Box::new(FileArray::new(workspace, array));
        let schema = storage.initialize(StorageMode::Read, None, false, false)?;
        Ok(Self { storage, schema })
    }

    /// The array's schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<OmicsSchema> {
        &self.schema
    }

    /// Streams every stored cell whose canonical coordinates fall inside the
    /// inclusive `sample_range` and `position_range` through `processor`, or
    /// through a summary printer when no processor is given. The level
    /// dimension is never constrained.
    ///
    /// # Errors
    /// Fails when the array cannot be read or the processor fails.
    pub fn query(
        &mut self,
        sample_range: [i64; 2],
        position_range: [i64; 2],
        processor: Option<&mut ExportProcessor<'_>>,
    ) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        let mut print_cell = |coords: &[i64; COORDS_PER_CELL], fields: &[FieldData]| {
            write_cell_summary(&mut stdout, coords, fields)?;
            Ok(ControlFlow::Continue(()))
        };
        let processor: &mut ExportProcessor<'_> = match processor {
            Some(processor) => processor,
            None => &mut print_cell,
        };

        let (row_range, col_range) = if self.schema.position_major() {
            (position_range, sample_range)
        } else {
            (sample_range, position_range)
        };
        let subarray = [row_range, col_range, [0, i64::MAX]];

        let schema = Arc::clone(&self.schema);
        self.storage.retrieve_by_cell(&subarray, &mut |coords, fields| {
            let mut pair = [coords[0], coords[1]];
            schema.swap_order(&mut pair);
            processor(&[pair[0], pair[1], coords[2]], fields)
        })
    }

    /// Verifies that the schema carries attribute `name` with exactly the
    /// expected type and length.
    ///
    /// # Errors
    /// Fails with [`OmicsError::Structural`] when the attribute is missing or
    /// differs from `expected`.
    pub fn check(&self, name: &str, expected: FieldInfo) -> Result<()> {
        match self.schema.attributes.get(name) {
            Some(actual) if *actual == expected => Ok(()),
            Some(actual) => Err(OmicsError::Structural {
                context: "array schema".to_string(),
                reason: format!(
                    "attribute '{name}' is {}/{}, expected {}/{}",
                    actual.field_type.as_str(),
                    actual.length_to_string(),
                    expected.field_type.as_str(),
                    expected.length_to_string()
                ),
            }),
            None => Err(OmicsError::Structural {
                context: "array schema".to_string(),
                reason: format!("attribute '{name}' is required"),
            }),
        }
    }
}

/// Writes the summary the default query processor prints for one cell: the
/// canonical coordinates, the field count, and each field's byte size.
pub fn write_cell_summary<W: Write>(
    out: &mut W,
    coords: &[i64; COORDS_PER_CELL],
    fields: &[FieldData],
) -> Result<()> {
    writeln!(out, "process {}, {}, {}", coords[0], coords[1], coords[2])?;
    writeln!(out, "{} fields", fields.len())?;
    for field in fields {
        writeln!(out, "\t{} bytes", field.len())?;
    }
    writeln!(out)?;
    Ok(())
}
