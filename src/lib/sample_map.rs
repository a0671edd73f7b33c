//! Mapping sample names to array rows.
//!
//! Importers look up every input sample here to place its cells on the sample
//! dimension; exporters invert the map to print names again. The map is a
//! plain two-column text file of name and row index.

use std::collections::HashMap;
use std::path::Path;

use fgoxide::io::Io;
use log::warn;

use crate::errors::{OmicsError, Result};

/// Sample name to row index map loaded from a tab-separated file.
///
/// Lines with fewer than two columns or an unparseable row index are logged
/// and skipped. When a name repeats, the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct SampleMap {
    rows: HashMap<String, usize>,
}

impl SampleMap {
    /// Loads a sample map from a file of `name<TAB>row` lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let lines = Io::default()
            .read_lines(&path)
            .map_err(|e| OmicsError::Storage {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut rows = HashMap::new();
        for line in &lines {
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split('\t');
            let entry = match (tokens.next(), tokens.next()) {
                (Some(name), Some(row)) => row.parse::<usize>().ok().map(|row| (name, row)),
                _ => None,
            };
            match entry {
                Some((name, row)) => {
                    rows.entry(name.to_string()).or_insert(row);
                }
                None => warn!("Skipping malformed sample map line: {line}"),
            }
        }
        Ok(Self { rows })
    }

    /// Row index of a sample name.
    #[must_use]
    pub fn row(&self, name: &str) -> Option<usize> {
        self.rows.get(name).copied()
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when no samples are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds the reverse map from row index to sample name.
    #[must_use]
    pub fn invert(&self) -> HashMap<usize, String> {
        self.rows.iter().map(|(name, &row)| (row, name.clone())).collect()
    }
}
