//! Per-array metadata: occupied extents along each dimension.
//!
//! Feature-level imports track the smallest and largest coordinate seen per
//! dimension so downstream consumers know the populated region without a
//! scan. The metadata lives as a small JSON file next to the schema.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{OmicsError, Result};

/// File name of the serialized metadata inside an array directory.
pub const METADATA_FILE_NAME: &str = "metadata";

/// Inclusive [start, end] extent along one dimension.
///
/// A fresh extent starts inverted (`start` above `end`) so the first
/// [`expand`](Extent::expand) pins both bounds to the first coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    /// Smallest coordinate seen
    pub start: u64,
    /// Largest coordinate seen
    pub end: u64,
}

impl Default for Extent {
    fn default() -> Self {
        Self { start: u64::MAX, end: 0 }
    }
}

impl Extent {
    /// Grows the extent to cover `value`.
    pub fn expand(&mut self, value: u64) {
        self.start = self.start.min(value);
        self.end = self.end.max(value);
    }

    /// The covered range, or `None` while the extent is still empty.
    #[must_use]
    pub fn range(&self) -> Option<(u64, u64)> {
        (self.start <= self.end).then_some((self.start, self.end))
    }
}

/// Dimension selector for extent updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Sample row dimension
    Sample,
    /// Feature key dimension
    Feature,
}

/// Extents of an array along its two dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayMetadata {
    /// Extent along the sample dimension
    pub sample: Extent,
    /// Extent along the feature dimension
    pub feature: Extent,
}

impl ArrayMetadata {
    /// Grows the extent of one dimension to cover `value`.
    pub fn expand_extent(&mut self, dimension: Dimension, value: u64) {
        match dimension {
            Dimension::Sample => self.sample.expand(value),
            Dimension::Feature => self.feature.expand(value),
        }
    }

    /// Extent of one dimension.
    #[must_use]
    pub fn extent(&self, dimension: Dimension) -> Extent {
        match dimension {
            Dimension::Sample => self.sample,
            Dimension::Feature => self.feature,
        }
    }

    /// Writes the metadata file into an array directory.
    pub fn store<P: AsRef<Path>>(&self, array_dir: P) -> Result<()> {
        let path = array_dir.as_ref().join(METADATA_FILE_NAME);
        let json = serde_json::to_string_pretty(self).map_err(|e| OmicsError::Structural {
            context: "array metadata".to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| OmicsError::storage(&path, e))
    }

    /// Reads the metadata file from an array directory, defaulting to empty
    /// extents when no file exists.
    pub fn load<P: AsRef<Path>>(array_dir: P) -> Result<Self> {
        let path = array_dir.as_ref().join(METADATA_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| OmicsError::storage(&path, e))?;
        serde_json::from_str(&text).map_err(|e| OmicsError::Structural {
            context: "array metadata".to_string(),
            reason: e.to_string(),
        })
    }
}
