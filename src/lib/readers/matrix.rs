//! Feature-level cells from score matrices.
//!
//! A matrix file is a delimited table with one labeled axis per direction:
//! a `SAMPLE` header puts samples in the columns and feature ids in the rows,
//! a `GENE` header the reverse. The row axis must match the array's physical
//! major dimension, because cells are emitted in file order and feature-level
//! imports rely on that order being close to sorted. Coordinates come out in
//! physical order directly: the feature id encodes to a key coordinate, the
//! sample name maps to its row index.

use std::io::{BufRead, Lines};
use std::path::Path;
use std::sync::Arc;

use fgoxide::io::Io;
use log::{debug, warn};

use crate::cell::{FieldData, OmicsCell};
use crate::encoder::FeatureEncoder;
use crate::errors::{OmicsError, Result};
use crate::readers::CellReader;
use crate::sample_map::SampleMap;
use crate::schema::OmicsSchema;

/// Resolved target of one matrix column.
#[derive(Debug, Clone, Copy)]
struct ColumnTarget {
    coord: i64,
    version: u8,
}

/// State of the data row currently being emitted.
struct RowState {
    coord: i64,
    version: u8,
    scores: Vec<f32>,
    cursor: usize,
}

/// Reader that yields feature-level cells from one matrix file.
///
/// Unknown sample labels are skipped quietly; unencodable feature ids are
/// skipped with a warning. Ragged rows and non-numeric scores abort the
/// import.
pub struct MatrixCellReader {
    lines: Lines<Box<dyn BufRead + Send>>,
    schema: Arc<OmicsSchema>,
    columns: Vec<Option<ColumnTarget>>,
    encoder: FeatureEncoder,
    sample_map: SampleMap,
    current: Option<RowState>,
    id_major: bool,
    file_idx: usize,
}

impl MatrixCellReader {
    /// Opens a matrix file and resolves its header row.
    pub fn new(
        path: &Path,
        file_idx: usize,
        schema: Arc<OmicsSchema>,
        sample_map: &SampleMap,
    ) -> Result<Self> {
        let reader = Io::default().new_reader(&path).map_err(|e| OmicsError::Storage {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(OmicsError::Structural {
                    context: "matrix file".to_string(),
                    reason: format!("'{}' is empty", path.display()),
                });
            }
        };
        let tokens = split_matrix_line(&header);
        let id_major = match tokens.first().copied() {
            Some("SAMPLE") => true,
            Some("GENE") => false,
            other => {
                return Err(OmicsError::Structural {
                    context: "matrix file".to_string(),
                    reason: format!(
                        "header must start with SAMPLE or GENE, found '{}'",
                        other.unwrap_or("")
                    ),
                });
            }
        };
        if id_major != schema.position_major() {
            return Err(OmicsError::Structural {
                context: "matrix file".to_string(),
                reason: format!(
                    "'{}' row axis does not match the array's major dimension",
                    path.display()
                ),
            });
        }

        let mut encoder = FeatureEncoder::new();
        let columns = tokens[1..]
            .iter()
            .map(|label| {
                if id_major {
                    resolve_sample(sample_map, label)
                } else {
                    resolve_feature(&mut encoder, label)
                }
            })
            .collect();

        schema.attribute_index("SCORE").ok_or_else(|| OmicsError::Structural {
            context: "feature-level schema".to_string(),
            reason: "attribute 'SCORE' is missing".to_string(),
        })?;

        Ok(Self {
            lines,
            schema,
            columns,
            encoder,
            sample_map: sample_map.clone(),
            current: None,
            id_major,
            file_idx,
        })
    }

    /// Parses one data line into row state, or `None` when its label is
    /// skipped.
    fn parse_row(&mut self, line: &str) -> Result<Option<RowState>> {
        let tokens = split_matrix_line(line);
        if tokens.len() != self.columns.len() + 1 {
            return Err(OmicsError::Structural {
                context: "matrix row".to_string(),
                reason: format!(
                    "expected {} columns, found {}",
                    self.columns.len() + 1,
                    tokens.len()
                ),
            });
        }

        let label = tokens[0];
        let target = if self.id_major {
            resolve_feature(&mut self.encoder, label)
        } else {
            resolve_sample(&self.sample_map, label)
        };
        let Some(target) = target else {
            return Ok(None);
        };

        let scores = tokens[1..]
            .iter()
            .map(|t| {
                t.parse::<f32>().map_err(|_| OmicsError::Structural {
                    context: "matrix row".to_string(),
                    reason: format!("score '{t}' is not numeric"),
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        Ok(Some(RowState { coord: target.coord, version: target.version, scores, cursor: 0 }))
    }

    fn next_cell_from_current(&mut self) -> Option<OmicsCell> {
        let state = self.current.as_mut()?;
        while state.cursor < self.columns.len() {
            let column = self.columns[state.cursor];
            let score = state.scores[state.cursor];
            state.cursor += 1;
            if let Some(target) = column {
                let mut cell = OmicsCell::new(
                    [state.coord, target.coord],
                    self.schema.attribute_count(),
                    Some(self.file_idx),
                );
                cell.version = if self.id_major { state.version } else { target.version };
                cell.add_field(&self.schema, "SCORE", FieldData::from_value(score));
                // VERSION is not a schema attribute; the byte travels on the cell
                cell.add_field(&self.schema, "VERSION", FieldData::from_value(cell.version));
                return Some(cell);
            }
        }
        self.current = None;
        None
    }
}

impl CellReader for MatrixCellReader {
    fn next_cells(&mut self) -> Result<Vec<OmicsCell>> {
        loop {
            if let Some(cell) = self.next_cell_from_current() {
                return Ok(vec![cell]);
            }
            let Some(line) = self.lines.next() else {
                return Ok(Vec::new());
            };
            let line = line?;
            if line.is_empty() {
                continue;
            }
            self.current = self.parse_row(&line)?;
        }
    }
}

fn split_matrix_line(line: &str) -> Vec<&str> {
    line.split(['\t', ',']).collect()
}

#[allow(clippy::cast_possible_wrap)]
fn resolve_sample(sample_map: &SampleMap, label: &str) -> Option<ColumnTarget> {
    match sample_map.row(label) {
        Some(row) => Some(ColumnTarget { coord: row as i64, version: 0 }),
        None => {
            debug!("Skipping unknown sample '{label}' in matrix");
            None
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn resolve_feature(encoder: &mut FeatureEncoder, label: &str) -> Option<ColumnTarget> {
    match encoder.encode(label) {
        (0, 0) => {
            warn!("Skipping unencodable feature id '{label}' in matrix");
            None
        }
        (key, version) => Some(ColumnTarget { coord: key as i64, version }),
    }
}
