//! Abstract storage interface for columnar array backends.
//!
//! The import and query paths never talk to a backend directly; they go
//! through [`ArrayStorage`], which models an array as a set of write-once
//! fragments. A fragment holds cells in sorted physical order; the backend
//! merges fragments back into one ordered stream at retrieval time. The
//! file-backed implementation lives in [`file`].

use std::ops::ControlFlow;
use std::sync::Arc;

use crate::cell::FieldData;
use crate::errors::Result;
use crate::schema::OmicsSchema;

pub mod file;

pub use file::FileArray;

/// Number of coordinate components per stored cell: two array coordinates
/// in physical order plus the write-order level.
pub const COORDS_PER_CELL: usize = 3;

/// Whether an array is opened for import or for retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Open an existing array and retrieve cells
    Read,
    /// Create or extend an array and store cells
    Write,
}

/// Callback invoked once per retrieved cell, with the cell's physical
/// coordinates and its attribute payloads in schema attribute order.
/// Returning `ControlFlow::Break` ends the retrieval early.
pub type CellProcessor<'a> =
    dyn FnMut(&[i64; COORDS_PER_CELL], &[FieldData]) -> Result<ControlFlow<()>> + 'a;

/// A columnar array backend.
///
/// Writers call [`initialize`](ArrayStorage::initialize) in write mode, then
/// [`store`](ArrayStorage::store) once per flushed buffer set, with
/// [`reopen_array`](ArrayStorage::reopen_array) in between whenever the
/// sorted run cannot extend the current fragment. Readers initialize in read
/// mode and walk cells with [`retrieve_by_cell`](ArrayStorage::retrieve_by_cell).
pub trait ArrayStorage {
    /// Opens the array.
    ///
    /// Write mode requires a schema, which is persisted alongside the array;
    /// read mode loads the persisted schema instead. `overwrite_workspace`
    /// and `overwrite_array` drop any existing workspace or array first and
    /// only apply in write mode.
    ///
    /// # Errors
    /// Fails when the workspace or array cannot be prepared, when write mode
    /// is missing a schema, or when read mode finds no stored schema.
    fn initialize(
        &mut self,
        mode: StorageMode,
        schema: Option<Arc<OmicsSchema>>,
        overwrite_workspace: bool,
        overwrite_array: bool,
    ) -> Result<Arc<OmicsSchema>>;

    /// Seals the fragment being written and starts a new one.
    ///
    /// Cells within one fragment must arrive in non-decreasing coordinate
    /// order; a writer that cannot keep that promise seals the fragment and
    /// continues in a fresh one.
    ///
    /// # Errors
    /// Fails when the backend cannot seal or create a fragment.
    fn reopen_array(&mut self) -> Result<()>;

    /// Appends one buffer set to the current fragment.
    ///
    /// Buffers follow the schema's attribute order: one data buffer per
    /// fixed-length attribute, an offset buffer then a payload buffer per
    /// variable-length attribute, and the coordinate buffer last.
    ///
    /// # Errors
    /// Fails when the buffer set does not match the schema layout or the
    /// write fails.
    fn store(&mut self, buffers: &[Vec<u8>]) -> Result<()>;

    /// Replays every stored cell inside `subarray` in global coordinate
    /// order, invoking `processor` once per cell.
    ///
    /// `subarray` holds one inclusive `[low, high]` range per coordinate
    /// component.
    ///
    /// # Errors
    /// Fails when a fragment cannot be decoded or the processor fails.
    fn retrieve_by_cell(
        &mut self,
        subarray: &[[i64; 2]; COORDS_PER_CELL],
        processor: &mut CellProcessor<'_>,
    ) -> Result<()>;

    /// Merges all fragments into a single globally sorted fragment. A writer
    /// that wants to store more cells afterwards must call
    /// [`reopen_array`](ArrayStorage::reopen_array) first.
    ///
    /// # Errors
    /// Fails when fragments cannot be read back or the merged fragment
    /// cannot be written.
    fn consolidate(&mut self) -> Result<()>;
}

/// Number of buffers a store call must supply for `schema`: fixed attributes
/// contribute one buffer, variable attributes two, plus the coordinate
/// buffer.
#[must_use]
pub fn buffer_count(schema: &OmicsSchema) -> usize {
    schema.attributes.values().map(|info| if info.is_variable() { 2 } else { 1 }).sum::<usize>()
        + 1
}

/// The unbounded subarray: every cell of the array falls inside it.
#[must_use]
pub fn full_subarray() -> [[i64; 2]; COORDS_PER_CELL] {
    [[0, i64::MAX]; COORDS_PER_CELL]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomic_map::GenomicMap;
    use crate::schema::{ArrayOrder, FieldInfo, FieldType};

    #[test]
    fn test_buffer_count_counts_variable_attributes_twice() {
        let mut schema = OmicsSchema::new(ArrayOrder::PositionMajor, GenomicMap::new(vec![]));
        schema.attributes.insert("SCORE".to_string(), FieldInfo::fixed(FieldType::Float, 1));
        assert_eq!(buffer_count(&schema), 2);
        schema
            .attributes
            .insert("NAME".to_string(), FieldInfo::variable(FieldType::Char));
        assert_eq!(buffer_count(&schema), 4);
    }

    #[test]
    fn test_full_subarray_is_unbounded() {
        let subarray = full_subarray();
        assert_eq!(subarray[0], [0, i64::MAX]);
        assert_eq!(subarray[2], [0, i64::MAX]);
    }
}
