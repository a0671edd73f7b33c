//! Interval-level cells from BED files.
//!
//! The track header names the sample; every data line becomes one cell per
//! interval endpoint carrying the interval's raw columns. Lines that fail to
//! parse are logged and skipped.

use std::io::{BufRead, Lines};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use fgoxide::io::Io;
use log::warn;
use regex::Regex;

use crate::cell::{FieldData, OmicsCell};
use crate::errors::{OmicsError, Result};
use crate::readers::CellReader;
use crate::sample_map::SampleMap;
use crate::schema::OmicsSchema;

/// Sample name inside the track header's description.
static BED_DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"description\s*=\s*"(.*?)""#).expect("valid regex"));

/// Attribute indices resolved against the interval-level schema.
struct IntervalFieldIndices {
    chrom: usize,
    start: usize,
    end: usize,
    score: usize,
    sample_name: usize,
    name: usize,
}

impl IntervalFieldIndices {
    fn resolve(schema: &OmicsSchema) -> Result<Self> {
        let index = |name: &str| {
            schema.attribute_index(name).ok_or_else(|| OmicsError::Structural {
                context: "interval-level schema".to_string(),
                reason: format!("attribute '{name}' is missing"),
            })
        };
        Ok(Self {
            chrom: index("CHROM")?,
            start: index("START")?,
            end: index("END")?,
            score: index("SCORE")?,
            sample_name: index("SAMPLE_NAME")?,
            name: index("NAME")?,
        })
    }
}

/// Reader that yields interval-level cells from one BED file.
///
/// The first line must be a track header whose `description="..."` names the
/// sample; a missing header or a sample absent from the sample map fails
/// construction.
pub struct BedCellReader {
    lines: Lines<Box<dyn BufRead + Send>>,
    schema: Arc<OmicsSchema>,
    fields: IntervalFieldIndices,
    sample_name: String,
    sample_row: i64,
    file_idx: usize,
}

impl BedCellReader {
    /// Opens a BED file and reads its track header.
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
                    context: "BED file".to_string(),
                    reason: format!("'{}' is empty", path.display()),
                });
            }
        };
        let sample_name = BED_DESCRIPTION_RE
            .captures(&header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| OmicsError::Structural {
                context: "BED file".to_string(),
                reason: format!("'{}' has no description in its track header", path.display()),
            })?;
        let sample_row = sample_map.row(&sample_name).ok_or_else(|| {
            OmicsError::Structural {
                context: "sample map".to_string(),
                reason: format!("sample '{sample_name}' has no row index"),
            }
        })?;

        let fields = IntervalFieldIndices::resolve(&schema)?;
        #[allow(clippy::cast_possible_wrap)]
        Ok(Self {
            lines,
            schema,
            fields,
            sample_name,
            sample_row: sample_row as i64,
            file_idx,
        })
    }

    fn build_cells(&self, line: &str) -> Result<Option<Vec<OmicsCell>>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 5 {
            warn!("Skipping short BED line: {line}");
            return Ok(None);
        }
        let parsed = tokens[1]
            .parse::<u64>()
            .ok()
            .zip(tokens[2].parse::<u64>().ok())
            .zip(tokens[4].parse::<f32>().ok());
        let Some(((start, end), score)) = parsed else {
            warn!("Skipping unparseable BED line: {line}");
            return Ok(None);
        };

        let chrom = tokens[0];
        let flat_start = self.schema.genomic_map.flatten(chrom, start)?;
        let flat_end = self.schema.genomic_map.flatten(chrom, end)?;

        let mut cell = OmicsCell::new(
            [self.sample_row, flat_start],
            self.schema.attribute_count(),
            Some(self.file_idx),
        );
        cell.fields[self.fields.chrom] = FieldData::from_text(chrom);
        cell.fields[self.fields.start] = FieldData::from_value(start);
        cell.fields[self.fields.end] = FieldData::from_value(end);
        cell.fields[self.fields.score] = FieldData::from_value(score);
        cell.fields[self.fields.sample_name] = FieldData::from_text(&self.sample_name);
        cell.fields[self.fields.name] = FieldData::from_text(tokens[3]);

        if flat_start == flat_end {
            return Ok(Some(vec![cell]));
        }
        let mut end_cell = cell.clone();
        end_cell.coords[1] = flat_end;
        end_cell.file_idx = None;
        Ok(Some(vec![cell, end_cell]))
    }
}

impl CellReader for BedCellReader {
    fn next_cells(&mut self) -> Result<Vec<OmicsCell>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(Vec::new());
            };
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if let Some(cells) = self.build_cells(&line)? {
                return Ok(cells);
            }
        }
    }
}
