//! Mapping between genomic (contig, offset) coordinates and a single flattened axis.
//!
//! Arrays index positions on one flattened dimension: contigs are laid end to end,
//! each at a fixed starting index, and a genomic coordinate becomes
//! `starting_index + offset`. The map supports both directions, so importers can
//! flatten reader coordinates and exporters can recover contig names.

use std::path::Path;

use fgoxide::io::Io;
use log::warn;

use crate::errors::{OmicsError, Result};

/// A single contig and its place on the flattened position axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    /// Contig name as it appears in input files (e.g., "chr1")
    pub name: String,
    /// Number of bases in the contig
    pub length: u64,
    /// First flattened position assigned to this contig
    pub starting_index: i64,
}

/// Bidirectional map between (contig, offset) pairs and flattened positions.
///
/// Contigs keep their insertion order; two sorted index vectors support binary
/// search by name (for [`flatten`](GenomicMap::flatten)) and by starting index
/// (for [`unflatten`](GenomicMap::unflatten)).
#[derive(Debug, Clone, Default)]
pub struct GenomicMap {
    contigs: Vec<Contig>,
    idxs_name: Vec<usize>,
    idxs_position: Vec<usize>,
}

impl GenomicMap {
    /// Builds a map from a list of contigs, keeping their order.
    #[must_use]
    pub fn new(contigs: Vec<Contig>) -> Self {
        let mut idxs_name: Vec<usize> = (0..contigs.len()).collect();
        idxs_name.sort_by(|&a, &b| contigs[a].name.cmp(&contigs[b].name));
        let mut idxs_position: Vec<usize> = (0..contigs.len()).collect();
        idxs_position.sort_by_key(|&i| contigs[i].starting_index);
        Self { contigs, idxs_name, idxs_position }
    }

    /// Loads a map from a mapping file.
    ///
    /// Each line holds a contig name, length, and starting index separated by
    /// whitespace. Malformed lines are logged and skipped.
    pub fn from_mapping_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let lines = Io::default()
            .read_lines(&path)
            .map_err(|e| OmicsError::Storage {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut contigs = Vec::new();
        for line in &lines {
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let parsed = match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(name), Some(length), Some(start)) => length
                    .parse::<u64>()
                    .ok()
                    .zip(start.parse::<i64>().ok())
                    .map(|(length, starting_index)| Contig {
                        name: name.to_string(),
                        length,
                        starting_index,
                    }),
                _ => None,
            };
            match parsed {
                Some(contig) => contigs.push(contig),
                None => warn!("Skipping malformed mapping line: {line}"),
            }
        }
        Ok(Self::new(contigs))
    }

    /// Returns contigs in insertion order.
    #[must_use]
    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// Returns the number of contigs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    /// Returns `true` when the map holds no contigs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    /// Converts a (contig, 0-based offset) pair to a flattened position.
    ///
    /// # Errors
    /// Fails when the contig is unknown or the offset is at or past the
    /// contig's length.
    pub fn flatten(&self, contig_name: &str, offset: u64) -> Result<i64> {
        let idx = self
            .idxs_name
            .binary_search_by(|&i| self.contigs[i].name.as_str().cmp(contig_name))
            .map_err(|_| OmicsError::Structural {
                context: "contig".to_string(),
                reason: format!("'{contig_name}' not found in genomic map"),
            })?;
        let contig = &self.contigs[self.idxs_name[idx]];
        if offset >= contig.length {
            return Err(OmicsError::Structural {
                context: "contig offset".to_string(),
                reason: format!(
                    "offset {offset} is beyond contig '{contig_name}' of length {}",
                    contig.length
                ),
            });
        }
        #[allow(clippy::cast_possible_wrap)]
        Ok(contig.starting_index + offset as i64)
    }

    /// Converts a flattened position back to its contig and 0-based offset.
    ///
    /// # Errors
    /// Fails when the position falls before the first contig or past the end
    /// of the contig that starts at or before it.
    pub fn unflatten(&self, position: i64) -> Result<(&Contig, u64)> {
        let n_before = self
            .idxs_position
            .partition_point(|&i| self.contigs[i].starting_index <= position);
        let contig = n_before
            .checked_sub(1)
            .map(|i| &self.contigs[self.idxs_position[i]])
            .ok_or_else(|| OmicsError::Structural {
                context: "flattened position".to_string(),
                reason: format!("position {position} precedes all contigs"),
            })?;
        #[allow(clippy::cast_possible_wrap)]
        let end = contig.starting_index + contig.length as i64;
        if position >= end {
            return Err(OmicsError::Structural {
                context: "flattened position".to_string(),
                reason: format!("position {position} is not covered by any contig"),
            });
        }
        #[allow(clippy::cast_sign_loss)]
        Ok((contig, (position - contig.starting_index) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn three_contig_map() -> GenomicMap {
        GenomicMap::new(vec![
            Contig { name: "chr1".to_string(), length: 1000, starting_index: 0 },
            Contig { name: "chr2".to_string(), length: 500, starting_index: 1000 },
            Contig { name: "chr3".to_string(), length: 100, starting_index: 1500 },
        ])
    }

    #[test]
    fn test_flatten_known_contigs() {
        let map = three_contig_map();
        assert_eq!(map.flatten("chr1", 0).unwrap(), 0);
        assert_eq!(map.flatten("chr1", 999).unwrap(), 999);
        assert_eq!(map.flatten("chr2", 10).unwrap(), 1010);
        assert_eq!(map.flatten("chr3", 99).unwrap(), 1599);
    }

    #[test]
    fn test_flatten_unknown_contig_fails() {
        let map = three_contig_map();
        assert!(map.flatten("chrMT", 0).is_err());
    }

    #[test]
    fn test_flatten_offset_past_contig_end_fails() {
        let map = three_contig_map();
        assert!(map.flatten("chr1", 1000).is_err());
        assert!(map.flatten("chr3", 100).is_err());
    }

    #[test]
    fn test_unflatten_recovers_contig_and_offset() {
        let map = three_contig_map();
        let (contig, offset) = map.unflatten(1010).unwrap();
        assert_eq!(contig.name, "chr2");
        assert_eq!(offset, 10);

        // Boundary between contigs
        let (contig, offset) = map.unflatten(999).unwrap();
        assert_eq!(contig.name, "chr1");
        assert_eq!(offset, 999);
        let (contig, offset) = map.unflatten(1000).unwrap();
        assert_eq!(contig.name, "chr2");
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_unflatten_uncovered_position_fails() {
        let map = three_contig_map();
        assert!(map.unflatten(1600).is_err());
        assert!(map.unflatten(-1).is_err());
    }

    #[test]
    fn test_flatten_unflatten_round_trip() {
        let map = three_contig_map();
        for (name, offset) in
            [("chr1", 0), ("chr1", 500), ("chr2", 0), ("chr2", 499), ("chr3", 57)]
        {
            let position = map.flatten(name, offset).unwrap();
            let (contig, back) = map.unflatten(position).unwrap();
            assert_eq!(contig.name, name);
            assert_eq!(back, offset);
        }
    }

    #[test]
    fn test_from_mapping_file_skips_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t1000\t0").unwrap();
        writeln!(file, "not a valid line").unwrap();
        writeln!(file, "chr2\tfive hundred\t1000").unwrap();
        writeln!(file, "chr2\t500\t1000").unwrap();
        file.flush().unwrap();

        let map = GenomicMap::from_mapping_file(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.flatten("chr2", 7).unwrap(), 1007);
    }

    #[test]
    fn test_empty_map() {
        let map = GenomicMap::new(Vec::new());
        assert!(map.is_empty());
        assert!(map.flatten("chr1", 0).is_err());
        assert!(map.unflatten(0).is_err());
    }
}
