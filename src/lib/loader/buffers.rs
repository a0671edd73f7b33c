//! Columnar cell packing.
//!
//! [`CellPacker`] turns merge-ordered cells into the buffer sets the storage
//! layer stores: one data buffer per fixed-length attribute, an offset and a
//! payload buffer per variable-length attribute, and the coordinate buffer
//! last. Buffers are soft-capped: a cell that would not fit triggers a flush
//! first, then packs into the emptied buffers even when it is larger than
//! the cap on its own.

use std::mem;
use std::sync::Arc;

use crate::cell::{FieldData, OmicsCell};
use crate::errors::{OmicsError, Result};
use crate::schema::OmicsSchema;
use crate::storage::{ArrayStorage, COORDS_PER_CELL};

/// Default soft capacity per buffer, in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_240;

const OFFSET_RECORD_BYTES: usize = 8;
const COORDS_RECORD_BYTES: usize = COORDS_PER_CELL * 8;

enum AttrBuffer {
    Fixed { data: Vec<u8>, cell_bytes: usize },
    Variable { offsets: Vec<u8>, payload: Vec<u8> },
}

/// Accumulates cells column-wise until a flush hands them to storage.
pub struct CellPacker {
    schema: Arc<OmicsSchema>,
    capacity: usize,
    attrs: Vec<AttrBuffer>,
    coords: Vec<u8>,
    buffered_cells: u64,
}

impl CellPacker {
    /// Creates a packer for `schema` with the given per-buffer byte capacity.
    #[must_use]
    pub fn new(schema: Arc<OmicsSchema>, capacity: usize) -> Self {
        let attrs = schema
            .attributes
            .values()
            .map(|info| match info.cell_bytes() {
                Some(cell_bytes) => AttrBuffer::Fixed { data: Vec::new(), cell_bytes },
                None => AttrBuffer::Variable { offsets: Vec::new(), payload: Vec::new() },
            })
            .collect();
        Self { schema, capacity, attrs, coords: Vec::new(), buffered_cells: 0 }
    }

    /// Number of cells packed since the last flush.
    #[must_use]
    pub fn buffered_cells(&self) -> u64 {
        self.buffered_cells
    }

    /// Whether `cell` fits into the current buffers without passing the cap.
    fn fits(&self, cell: &OmicsCell) -> bool {
        for (idx, attr) in self.attrs.iter().enumerate() {
            let field_len = cell.field(idx).map_or(0, FieldData::len);
            let ok = match attr {
                AttrBuffer::Fixed { data, cell_bytes } => data.len() + cell_bytes <= self.capacity,
                AttrBuffer::Variable { offsets, payload } => {
                    offsets.len() + OFFSET_RECORD_BYTES <= self.capacity
                        && payload.len() + field_len <= self.capacity
                }
            };
            if !ok {
                return false;
            }
        }
        self.coords.len() + COORDS_RECORD_BYTES <= self.capacity
    }

    /// Appends `cell` at write-order `level` to the buffers.
    fn pack(&mut self, cell: &OmicsCell, level: i64) -> Result<()> {
        for ((idx, attr), name) in
            self.attrs.iter_mut().enumerate().zip(self.schema.attributes.keys())
        {
            let field = cell.field(idx).ok_or_else(|| OmicsError::Structural {
                context: "cell fields".to_string(),
                reason: format!("cell carries no payload for attribute '{name}'"),
            })?;
            match attr {
                AttrBuffer::Fixed { data, cell_bytes } => {
                    if field.len() != *cell_bytes {
                        return Err(OmicsError::Structural {
                            context: "cell fields".to_string(),
                            reason: format!(
                                "attribute '{name}' holds {} bytes, schema fixes {cell_bytes}",
                                field.len()
                            ),
                        });
                    }
                    data.extend_from_slice(field.bytes());
                }
                AttrBuffer::Variable { offsets, payload } => {
                    offsets.extend_from_slice(&(payload.len() as u64).to_le_bytes());
                    payload.extend_from_slice(field.bytes());
                }
            }
        }
        for coord in [cell.coords[0], cell.coords[1], level] {
            self.coords.extend_from_slice(&coord.to_le_bytes());
        }
        self.buffered_cells += 1;
        Ok(())
    }

    /// Packs `cell`, flushing first when it would overflow a buffer.
    ///
    /// # Errors
    /// Fails when the cell's payloads do not match the schema or the flush
    /// fails.
    pub fn buffer_cell(
        &mut self,
        cell: &OmicsCell,
        level: i64,
        storage: &mut dyn ArrayStorage,
    ) -> Result<()> {
        if !self.fits(cell) {
            self.flush(storage)?;
        }
        self.pack(cell, level)
    }

    /// Hands all buffered cells to storage and resets every buffer, offset,
    /// and counter. A flush with nothing buffered is a no-op.
    ///
    /// # Errors
    /// Fails when the storage write fails.
    pub fn flush(&mut self, storage: &mut dyn ArrayStorage) -> Result<()> {
        if self.buffered_cells == 0 {
            return Ok(());
        }
        let mut buffers = Vec::with_capacity(self.attrs.len() * 2 + 1);
        for attr in &mut self.attrs {
            match attr {
                AttrBuffer::Fixed { data, .. } => buffers.push(mem::take(data)),
                AttrBuffer::Variable { offsets, payload } => {
                    buffers.push(mem::take(offsets));
                    buffers.push(mem::take(payload));
                }
            }
        }
        buffers.push(mem::take(&mut self.coords));
        self.buffered_cells = 0;
        storage.store(&buffers)
    }
}
