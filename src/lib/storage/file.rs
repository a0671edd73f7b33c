//! File-backed array storage.
//!
//! An array is a directory under the workspace holding the serialized schema
//! plus one file per fragment. Every [`ArrayStorage::store`] call appends one
//! length-prefixed block of buffers to the current fragment file;
//! [`ArrayStorage::reopen_array`] seals that file and starts the next one.
//! Retrieval decodes all fragments, filters by subarray, and merges the
//! survivors back into one coordinate-ordered stream.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::cell::FieldData;
use crate::errors::{OmicsError, Result};
use crate::schema::OmicsSchema;
use crate::storage::{
    buffer_count, full_subarray, ArrayStorage, CellProcessor, StorageMode, COORDS_PER_CELL,
};

const FRAGMENT_PREFIX: &str = "fragment_";
const COORDS_BYTES: usize = COORDS_PER_CELL * 8;

/// One decoded cell: physical coordinates plus attribute payloads in schema
/// attribute order.
#[derive(Debug, Clone)]
struct StoredCell {
    coords: [i64; COORDS_PER_CELL],
    fields: Vec<FieldData>,
}

/// Array backend that keeps fragments as flat files.
pub struct FileArray {
    workspace: PathBuf,
    array: String,
    mode: Option<StorageMode>,
    schema: Option<Arc<OmicsSchema>>,
    sealed: Vec<PathBuf>,
    writer: Option<(PathBuf, File)>,
    next_fragment: usize,
}

impl FileArray {
    /// Creates a handle for `array` inside `workspace`. Nothing touches the
    /// filesystem until [`ArrayStorage::initialize`] runs.
    #[must_use]
    pub fn new<P: AsRef<Path>>(workspace: P, array: &str) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            array: array.to_string(),
            mode: None,
            schema: None,
            sealed: Vec::new(),
            writer: None,
            next_fragment: 0,
        }
    }

    /// Directory holding this array's schema and fragments.
    #[must_use]
    pub fn array_dir(&self) -> PathBuf {
        self.workspace.join(&self.array)
    }

    fn schema_ref(&self) -> Result<&Arc<OmicsSchema>> {
        self.schema.as_ref().ok_or_else(not_initialized)
    }

    fn scan_fragments(&self) -> Result<Vec<PathBuf>> {
        let dir = self.array_dir();
        let entries = fs::read_dir(&dir).map_err(|e| OmicsError::storage(&dir, e))?;
        let mut fragments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OmicsError::storage(&dir, e))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(FRAGMENT_PREFIX) {
                fragments.push(entry.path());
            }
        }
        fragments.sort();
        Ok(fragments)
    }

    fn open_fragment(&mut self) -> Result<()> {
        let path = self.array_dir().join(format!("{FRAGMENT_PREFIX}{:04}", self.next_fragment));
        self.next_fragment += 1;
        let file = File::create(&path).map_err(|e| OmicsError::storage(&path, e))?;
        self.writer = Some((path, file));
        Ok(())
    }

    /// Closes the open fragment, dropping it entirely when no block was
    /// written to it.
    fn seal_fragment(&mut self) {
        if let Some((path, file)) = self.writer.take() {
            let empty = file.metadata().map(|m| m.len() == 0).unwrap_or(false);
            drop(file);
            if empty {
                let _ = fs::remove_file(&path);
            } else {
                self.sealed.push(path);
            }
        }
    }

    fn decode_all(
        &self,
        schema: &OmicsSchema,
        subarray: &[[i64; 2]; COORDS_PER_CELL],
    ) -> Result<Vec<StoredCell>> {
        let mut cells = Vec::new();
        for path in &self.sealed {
            decode_fragment(schema, path, subarray, &mut cells)?;
        }
        if let Some((path, _)) = &self.writer {
            decode_fragment(schema, path, subarray, &mut cells)?;
        }
        cells.sort_by(|a, b| a.coords.cmp(&b.coords));
        Ok(cells)
    }
}

impl ArrayStorage for FileArray {
    fn initialize(
        &mut self,
        mode: StorageMode,
        schema: Option<Arc<OmicsSchema>>,
        overwrite_workspace: bool,
        overwrite_array: bool,
    ) -> Result<Arc<OmicsSchema>> {
        let array_dir = self.array_dir();
        let schema = match mode {
            StorageMode::Write => {
                if overwrite_workspace && self.workspace.exists() {
                    fs::remove_dir_all(&self.workspace)
                        .map_err(|e| OmicsError::storage(&self.workspace, e))?;
                }
                if overwrite_array && array_dir.exists() {
                    fs::remove_dir_all(&array_dir)
                        .map_err(|e| OmicsError::storage(&array_dir, e))?;
                }
                fs::create_dir_all(&array_dir)
                    .map_err(|e| OmicsError::storage(&array_dir, e))?;
                let schema = schema.ok_or_else(|| OmicsError::Structural {
                    context: "array schema".to_string(),
                    reason: "write mode requires a schema".to_string(),
                })?;
                schema.store(&array_dir)?;
                self.sealed = self.scan_fragments()?;
                self.next_fragment = next_fragment_number(&self.sealed);
                self.schema = Some(Arc::clone(&schema));
                self.mode = Some(StorageMode::Write);
                self.open_fragment()?;
                debug!("Opened array '{}' for writing", array_dir.display());
                schema
            }
            StorageMode::Read => {
                if !array_dir.is_dir() {
                    return Err(OmicsError::Storage {
                        path: array_dir.display().to_string(),
                        reason: "array does not exist".to_string(),
                    });
                }
                let schema = Arc::new(OmicsSchema::load(&array_dir)?);
                self.sealed = self.scan_fragments()?;
                self.writer = None;
                self.schema = Some(Arc::clone(&schema));
                self.mode = Some(StorageMode::Read);
                debug!(
                    "Opened array '{}' for reading ({} fragments)",
                    array_dir.display(),
                    self.sealed.len()
                );
                schema
            }
        };
        Ok(schema)
    }

    fn reopen_array(&mut self) -> Result<()> {
        match self.mode {
            Some(StorageMode::Write) => {
                self.seal_fragment();
                self.open_fragment()
            }
            Some(StorageMode::Read) => {
                self.sealed = self.scan_fragments()?;
                Ok(())
            }
            None => Err(not_initialized()),
        }
    }

    fn store(&mut self, buffers: &[Vec<u8>]) -> Result<()> {
        if self.mode != Some(StorageMode::Write) {
            return Err(OmicsError::Structural {
                context: "storage handle".to_string(),
                reason: "array is not open for writing".to_string(),
            });
        }
        let expected = buffer_count(self.schema_ref()?);
        if buffers.len() != expected {
            return Err(OmicsError::Structural {
                context: "store buffers".to_string(),
                reason: format!("expected {expected} buffers, got {}", buffers.len()),
            });
        }
        let coords_len = buffers[expected - 1].len();
        if !coords_len.is_multiple_of(COORDS_BYTES) {
            return Err(OmicsError::Structural {
                context: "coordinate buffer".to_string(),
                reason: format!("{coords_len} bytes is not a whole number of cells"),
            });
        }
        let Some((path, file)) = self.writer.as_mut() else {
            return Err(not_initialized());
        };
        write_block(path, file, buffers)?;
        debug!(
            "Stored block of {} cells to '{}'",
            coords_len / COORDS_BYTES,
            path.display()
        );
        Ok(())
    }

    fn retrieve_by_cell(
        &mut self,
        subarray: &[[i64; 2]; COORDS_PER_CELL],
        processor: &mut CellProcessor<'_>,
    ) -> Result<()> {
        let schema = Arc::clone(self.schema_ref()?);
        let cells = self.decode_all(&schema, subarray)?;
        for cell in &cells {
            if processor(&cell.coords, &cell.fields)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn consolidate(&mut self) -> Result<()> {
        let schema = Arc::clone(self.schema_ref()?);
        self.seal_fragment();
        let sources = self.sealed.clone();
        let cells = self.decode_all(&schema, &full_subarray())?;
        let buffers = encode_cells(&schema, &cells);

        let array_dir = self.array_dir();
        let tmp = array_dir.join("consolidate.tmp");
        let mut file = File::create(&tmp).map_err(|e| OmicsError::storage(&tmp, e))?;
        write_block(&tmp, &mut file, &buffers)?;
        drop(file);

        for path in &sources {
            fs::remove_file(path).map_err(|e| OmicsError::storage(path, e))?;
        }
        let target = array_dir.join(format!("{FRAGMENT_PREFIX}0000"));
        fs::rename(&tmp, &target).map_err(|e| OmicsError::storage(&target, e))?;
        self.sealed = vec![target];
        self.next_fragment = 1;
        info!("Consolidated {} fragments into 1 ({} cells)", sources.len(), cells.len());
        Ok(())
    }
}

fn not_initialized() -> OmicsError {
    OmicsError::Structural {
        context: "storage handle".to_string(),
        reason: "array is not initialized".to_string(),
    }
}

fn next_fragment_number(sealed: &[PathBuf]) -> usize {
    sealed
        .iter()
        .filter_map(|path| {
            path.file_name()?.to_str()?.strip_prefix(FRAGMENT_PREFIX)?.parse::<usize>().ok()
        })
        .max()
        .map_or(0, |n| n + 1)
}

fn write_block(path: &Path, file: &mut File, buffers: &[Vec<u8>]) -> Result<()> {
    let mut header = Vec::with_capacity(8 * (buffers.len() + 1));
    header.extend_from_slice(&(buffers.len() as u64).to_le_bytes());
    for buffer in buffers {
        header.extend_from_slice(&(buffer.len() as u64).to_le_bytes());
    }
    file.write_all(&header).map_err(|e| OmicsError::storage(path, e))?;
    for buffer in buffers {
        file.write_all(buffer).map_err(|e| OmicsError::storage(path, e))?;
    }
    Ok(())
}

/// Lays cells back out as store-order buffers: per-attribute data and offset
/// buffers first, the coordinate buffer last.
fn encode_cells(schema: &OmicsSchema, cells: &[StoredCell]) -> Vec<Vec<u8>> {
    let count = buffer_count(schema);
    let mut buffers = vec![Vec::new(); count];
    for cell in cells {
        let mut idx = 0;
        for (attr, info) in schema.attributes.values().enumerate() {
            let field = &cell.fields[attr];
            if info.is_variable() {
                let payload_offset = buffers[idx + 1].len() as u64;
                buffers[idx].extend_from_slice(&payload_offset.to_le_bytes());
                buffers[idx + 1].extend_from_slice(field.bytes());
                idx += 2;
            } else {
                buffers[idx].extend_from_slice(field.bytes());
                idx += 1;
            }
        }
        for coord in &cell.coords {
            buffers[count - 1].extend_from_slice(&coord.to_le_bytes());
        }
    }
    buffers
}

fn decode_fragment(
    schema: &OmicsSchema,
    path: &Path,
    subarray: &[[i64; 2]; COORDS_PER_CELL],
    out: &mut Vec<StoredCell>,
) -> Result<()> {
    let bytes = fs::read(path).map_err(|e| OmicsError::storage(path, e))?;
    let mut cursor = 0;
    while cursor < bytes.len() {
        let buffers = read_block(&bytes, &mut cursor, path)?;
        decode_block(schema, &buffers, subarray, path, out)?;
    }
    Ok(())
}

fn read_block<'a>(bytes: &'a [u8], cursor: &mut usize, path: &Path) -> Result<Vec<&'a [u8]>> {
    let count = take_len(bytes, cursor, path)?;
    let mut lens = Vec::with_capacity(count);
    for _ in 0..count {
        lens.push(take_len(bytes, cursor, path)?);
    }
    let mut buffers = Vec::with_capacity(count);
    for len in lens {
        buffers.push(take(bytes, cursor, len, path)?);
    }
    Ok(buffers)
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, n: usize, path: &Path) -> Result<&'a [u8]> {
    let end = cursor
        .checked_add(n)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| truncated(path))?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn take_len(bytes: &[u8], cursor: &mut usize, path: &Path) -> Result<usize> {
    let raw = take(bytes, cursor, 8, path)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);
    usize::try_from(u64::from_le_bytes(buf)).map_err(|_| truncated(path))
}

fn truncated(path: &Path) -> OmicsError {
    OmicsError::Storage {
        path: path.display().to_string(),
        reason: "truncated fragment block".to_string(),
    }
}

fn decode_block(
    schema: &OmicsSchema,
    buffers: &[&[u8]],
    subarray: &[[i64; 2]; COORDS_PER_CELL],
    path: &Path,
    out: &mut Vec<StoredCell>,
) -> Result<()> {
    let expected = buffer_count(schema);
    if buffers.len() != expected {
        return Err(OmicsError::Storage {
            path: path.display().to_string(),
            reason: format!("block holds {} buffers, schema needs {expected}", buffers.len()),
        });
    }
    let coords = buffers[expected - 1];
    if !coords.len().is_multiple_of(COORDS_BYTES) {
        return Err(OmicsError::Storage {
            path: path.display().to_string(),
            reason: "coordinate buffer is not a whole number of cells".to_string(),
        });
    }
    let ncells = coords.len() / COORDS_BYTES;

    let mut decoded: Vec<StoredCell> = (0..ncells)
        .map(|i| StoredCell {
            coords: read_coord_triple(coords, i),
            fields: Vec::with_capacity(schema.attribute_count()),
        })
        .collect();

    let mut idx = 0;
    for (name, info) in &schema.attributes {
        if let Some(width) = info.cell_bytes() {
            let data = buffers[idx];
            idx += 1;
            if data.len() != ncells * width {
                return Err(attribute_mismatch(path, name, "data"));
            }
            for (i, cell) in decoded.iter_mut().enumerate() {
                cell.fields.push(FieldData::from_bytes(data[i * width..(i + 1) * width].to_vec()));
            }
        } else {
            let offsets_buf = buffers[idx];
            let payload = buffers[idx + 1];
            idx += 2;
            if offsets_buf.len() != ncells * 8 {
                return Err(attribute_mismatch(path, name, "offset"));
            }
            let mut offsets = Vec::with_capacity(ncells);
            for chunk in offsets_buf.chunks_exact(8) {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                offsets.push(
                    usize::try_from(u64::from_le_bytes(buf)).map_err(|_| truncated(path))?,
                );
            }
            for (i, cell) in decoded.iter_mut().enumerate() {
                let start = offsets[i];
                let end = if i + 1 < ncells { offsets[i + 1] } else { payload.len() };
                if start > end || end > payload.len() {
                    return Err(attribute_mismatch(path, name, "offset"));
                }
                cell.fields.push(FieldData::from_bytes(payload[start..end].to_vec()));
            }
        }
    }

    out.extend(decoded.into_iter().filter(|cell| in_subarray(&cell.coords, subarray)));
    Ok(())
}

fn attribute_mismatch(path: &Path, name: &str, kind: &str) -> OmicsError {
    OmicsError::Storage {
        path: path.display().to_string(),
        reason: format!("{kind} buffer for attribute '{name}' does not match the cell count"),
    }
}

fn read_coord_triple(coords: &[u8], i: usize) -> [i64; COORDS_PER_CELL] {
    let mut out = [0_i64; COORDS_PER_CELL];
    for (d, slot) in out.iter_mut().enumerate() {
        let offset = i * COORDS_BYTES + d * 8;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&coords[offset..offset + 8]);
        *slot = i64::from_le_bytes(buf);
    }
    out
}

fn in_subarray(
    coords: &[i64; COORDS_PER_CELL],
    subarray: &[[i64; 2]; COORDS_PER_CELL],
) -> bool {
    coords.iter().zip(subarray.iter()).all(|(c, range)| range[0] <= *c && *c <= range[1])
}
