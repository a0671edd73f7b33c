//! Matrix regeneration from feature-level query output.
//!
//! Cells arrive feature-major, one score per (feature, sample) pair. The
//! column header cannot be known until the first feature's row has streamed
//! past, so that row's scores are buffered while its sample ids build the
//! header; every later row streams straight through. Column order is the
//! sample order of the first feature, which matches all later features
//! because queries return samples in ascending order within each feature.

use std::collections::HashMap;
use std::io::Write;

use crate::errors::{OmicsError, Result};

/// Streaming writer that lays feature score rows out as a tab-separated
/// matrix with a `SAMPLE` header row.
pub struct MatrixWriter<W: Write> {
    out: W,
    inverse_sample_map: Option<HashMap<usize, String>>,
    first_entry: bool,
    first_row: bool,
    prev_feature: String,
    scores: Vec<f32>,
}

impl<W: Write> MatrixWriter<W> {
    /// Creates a writer that labels columns with numeric sample rows.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            inverse_sample_map: None,
            first_entry: true,
            first_row: true,
            prev_feature: String::new(),
            scores: Vec::new(),
        }
    }

    /// Labels columns with sample names instead of numeric rows.
    #[must_use]
    pub fn with_inverse_sample_map(mut self, map: HashMap<usize, String>) -> Self {
        self.inverse_sample_map = Some(map);
        self
    }

    /// Adds one score. Calls must arrive feature-major: all of a feature's
    /// samples before the next feature begins.
    ///
    /// # Errors
    /// Fails when writing fails or a sample row has no name in the inverse
    /// sample map.
    pub fn process(&mut self, feature_id: &str, sample_id: u64, score: f32) -> Result<()> {
        if self.first_entry {
            write!(self.out, "SAMPLE")?;
            self.prev_feature = feature_id.to_string();
            self.first_entry = false;
        }
        if self.prev_feature != feature_id {
            if self.first_row {
                self.write_buffered_row()?;
                self.first_row = false;
                self.scores.clear();
                self.inverse_sample_map = None;
            }
            write!(self.out, "\n{feature_id}")?;
            self.prev_feature = feature_id.to_string();
        }
        if self.first_row {
            self.scores.push(score);
            self.write_column_label(sample_id)?;
        } else {
            write!(self.out, "\t{score:.6}")?;
        }
        Ok(())
    }

    /// Writes any still-buffered row and the final newline, then flushes.
    ///
    /// # Errors
    /// Fails when the final write or flush fails.
    pub fn finish(mut self) -> Result<W> {
        if !self.first_entry {
            // A single-feature matrix never sees a feature change, so its
            // score row is still buffered here
            if self.first_row {
                self.write_buffered_row()?;
            }
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_column_label(&mut self, sample_id: u64) -> Result<()> {
        match &self.inverse_sample_map {
            Some(map) => {
                let name = map.get(&(sample_id as usize)).ok_or_else(|| {
                    OmicsError::Structural {
                        context: "sample map".to_string(),
                        reason: format!("sample row {sample_id} has no name"),
                    }
                })?;
                write!(self.out, "\t{name}")?;
            }
            None => write!(self.out, "\t{sample_id}")?,
        }
        Ok(())
    }

    fn write_buffered_row(&mut self) -> Result<()> {
        write!(self.out, "\n{}", self.prev_feature)?;
        for score in &self.scores {
            write!(self.out, "\t{score:.6}")?;
        }
        Ok(())
    }
}
