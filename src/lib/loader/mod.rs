//! Merge-sort import of cell streams into an array.
//!
//! The loader drains every input reader through one binary heap keyed on
//! physical coordinates, so cells reach the packer as a single globally
//! sorted stream. Each popped cell first refills the heap from its reader of
//! origin, which keeps exactly one pending cell group per input alive and
//! bounds memory by input count rather than input size.
//!
//! Read- and interval-level imports require coordinate-sorted inputs and
//! abort when the merged stream would step backwards. Feature-matrix imports
//! tolerate disorder instead: whenever the next queued cell precedes the one
//! just packed, the current fragment is sealed and a fresh one started.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::cell::OmicsCell;
use crate::config::{read_file_list, ImportKind, ResolvedImportConfig};
use crate::errors::{OmicsError, Result};
use crate::genomic_map::GenomicMap;
use crate::loader::buffers::{CellPacker, DEFAULT_BUFFER_CAPACITY};
use crate::logging::OperationTimer;
use crate::metadata::{ArrayMetadata, Dimension};
use crate::progress::ProgressTracker;
use crate::readers::{create_schema, open_readers, CellReader};
use crate::sample_map::SampleMap;
use crate::schema::{ArrayOrder, OmicsSchema};
use crate::storage::{ArrayStorage, FileArray, StorageMode};

pub mod buffers;

/// Cells buffered before an unconditional flush, by default.
pub const DEFAULT_CELL_FLUSH_LIMIT: u64 = 2 * 1024 * 1024;

/// Heap entry ordered by physical coordinates only, so the payload never
/// influences merge order.
struct QueuedCell(OmicsCell);

impl PartialEq for QueuedCell {
    fn eq(&self, other: &Self) -> bool {
        self.0.coords == other.0.coords
    }
}

impl Eq for QueuedCell {}

impl PartialOrd for QueuedCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.coords.cmp(&other.0.coords)
    }
}

/// Imports a set of input files into one array.
pub struct OmicsLoader {
    storage: Box<dyn ArrayStorage>,
    readers: Vec<Box<dyn CellReader>>,
    schema: Arc<OmicsSchema>,
    kind: ImportKind,
    packer: CellPacker,
    cell_flush_limit: u64,
    array_dir: PathBuf,
    metadata: ArrayMetadata,
    level: i64,
    last_coords: Option<[i64; 2]>,
    split_warned: bool,
}

impl OmicsLoader {
    /// Builds a loader: loads the sample and contig maps, derives the array
    /// schema for the import kind, opens one reader per matching input file,
    /// and initializes the array for writing.
    ///
    /// # Errors
    /// Fails when a map or the file list cannot be loaded, no input file
    /// matches the import kind, or the array cannot be created.
    pub fn new<P: AsRef<Path>>(
        workspace: P,
        array: &str,
        config: &ResolvedImportConfig,
    ) -> Result<Self> {
        let sample_map = SampleMap::from_file(&config.sample_map)?;
        let genomic_map = match &config.mapping_file {
            Some(path) => GenomicMap::from_mapping_file(path)?,
            None => GenomicMap::new(Vec::new()),
        };
        let order = if config.position_major {
            ArrayOrder::PositionMajor
        } else {
            ArrayOrder::SampleMajor
        };
        let schema = Arc::new(create_schema(config.kind, order, genomic_map));

        let files = read_file_list(&config.file_list)?;
        let readers = open_readers(config.kind, &files, &schema, &sample_map)?;
        if readers.is_empty() {
            return Err(OmicsError::Structural {
                context: "import file list".to_string(),
                reason: format!(
                    "'{}' names no inputs usable for a {} import",
                    config.file_list.display(),
                    config.kind.as_str()
                ),
            });
        }

        let mut storage: Box<dyn ArrayStorage> = Box::new(FileArray::new(&workspace, array));
        storage.initialize(StorageMode::Write, Some(Arc::clone(&schema)), false, true)?;

        Ok(Self {
            storage,
            readers,
            packer: CellPacker::new(Arc::clone(&schema), DEFAULT_BUFFER_CAPACITY),
            schema,
            kind: config.kind,
            cell_flush_limit: DEFAULT_CELL_FLUSH_LIMIT,
            array_dir: workspace.as_ref().join(array),
            metadata: ArrayMetadata::default(),
            level: 0,
            last_coords: None,
            split_warned: false,
        })
    }

    /// Replaces the packer with one using `capacity` bytes per buffer.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.packer = CellPacker::new(Arc::clone(&self.schema), capacity);
        self
    }

    /// Overrides the unconditional flush threshold.
    #[must_use]
    pub fn with_cell_flush_limit(mut self, limit: u64) -> Self {
        self.cell_flush_limit = limit;
        self
    }

    /// Runs the import to completion and returns the number of cells stored.
    ///
    /// # Errors
    /// Fails when a reader, the ordering contract, or storage fails.
    pub fn import(mut self) -> Result<u64> {
        let timer = OperationTimer::new("Import");
        let progress = ProgressTracker::new("Imported cells");
        let mut heap: BinaryHeap<Reverse<QueuedCell>> = BinaryHeap::new();
        for idx in 0..self.readers.len() {
            self.enqueue_from(idx, &mut heap)?;
        }

        let mut imported = 0_u64;
        while let Some(Reverse(QueuedCell(cell))) = heap.pop() {
            if let Some(idx) = cell.file_idx {
                self.enqueue_from(idx, &mut heap)?;
            }
            if cell.coords[0] < 0 || cell.coords[1] < 0 {
                continue;
            }
            if self.kind != ImportKind::FeatureLevel {
                if let Some(Reverse(top)) = heap.peek() {
                    if top.0.coords < cell.coords {
                        return Err(OmicsError::Structural {
                            context: "import order".to_string(),
                            reason: format!(
                                "cell at ({}, {}) follows ({}, {}); inputs must be \
                                 coordinate-sorted",
                                top.0.coords[0],
                                top.0.coords[1],
                                cell.coords[0],
                                cell.coords[1]
                            ),
                        });
                    }
                }
            }

            let level = self.next_level(&cell);
            if self.kind == ImportKind::FeatureLevel {
                self.expand_extents(&cell);
            }
            self.packer.buffer_cell(&cell, level, self.storage.as_mut())?;
            imported += 1;
            progress.log_if_needed(1);

            let split =
                heap.peek().is_some_and(|Reverse(top)| top.0.coords < cell.coords);
            if self.packer.buffered_cells() > self.cell_flush_limit || split {
                self.packer.flush(self.storage.as_mut())?;
                if split {
                    if !self.split_warned {
                        warn!(
                            "Cells arrived out of sorted order; continuing in a new \
                             fragment. Consolidating the array after import is recommended"
                        );
                        self.split_warned = true;
                    }
                    self.storage.reopen_array()?;
                }
            }
        }

        self.packer.flush(self.storage.as_mut())?;
        if self.kind == ImportKind::FeatureLevel {
            self.metadata.store(&self.array_dir)?;
        }
        progress.log_final();
        timer.log_completion(imported);
        Ok(imported)
    }

    /// Pulls the next cell group from reader `idx` and queues it in physical
    /// coordinate order. Matrix cells already carry physical coordinates;
    /// everything else arrives as (sample, position) and is swapped here.
    fn enqueue_from(
        &mut self,
        idx: usize,
        heap: &mut BinaryHeap<Reverse<QueuedCell>>,
    ) -> Result<()> {
        let cells = self.readers[idx].next_cells()?;
        for mut cell in cells {
            if self.kind != ImportKind::FeatureLevel {
                self.schema.swap_order(&mut cell.coords);
            }
            heap.push(Reverse(QueuedCell(cell)));
        }
        Ok(())
    }

    /// Write-order discriminator for `cell`: consecutive cells at the same
    /// coordinates count up from zero, and feature-matrix cells reuse their
    /// feature id version instead.
    fn next_level(&mut self, cell: &OmicsCell) -> i64 {
        if self.kind == ImportKind::FeatureLevel {
            return i64::from(cell.version);
        }
        if self.last_coords == Some(cell.coords) {
            self.level += 1;
        } else {
            self.level = 0;
            self.last_coords = Some(cell.coords);
        }
        self.level
    }

    fn expand_extents(&mut self, cell: &OmicsCell) {
        let (feature, sample) = if self.schema.position_major() {
            (cell.coords[0], cell.coords[1])
        } else {
            (cell.coords[1], cell.coords[0])
        };
        if let Ok(value) = u64::try_from(sample) {
            self.metadata.expand_extent(Dimension::Sample, value);
        }
        if let Ok(value) = u64::try_from(feature) {
            self.metadata.expand_extent(Dimension::Feature, value);
        }
    }
}
