//! Gene and transcript interval maps.
//!
//! Feature-level consumers need to know where each feature sits on the genome.
//! This map carries one interval per feature id, both in contig-relative
//! coordinates and flattened through a [`GenomicMap`], and loads from three
//! formats: annotation GTF, a compact binary `.gi` file, and a plain `.gbed`
//! text file. The binary and text forms store contig-relative coordinates and
//! are flattened at load time, so the same file works against any genomic map
//! that names the same contigs. The binary form can be re-exported for fast
//! reloading.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use fgoxide::io::Io;
use log::warn;
use regex::Regex;

use crate::errors::{OmicsError, Result};
use crate::genomic_map::GenomicMap;

/// Pulls the quoted transcript id out of a GTF attribute list.
static TRANSCRIPT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"transcript_id\s*"(.*?)""#).expect("valid regex"));

/// Pulls the quoted gene id out of a GTF attribute list.
static GENE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"gene_id\s*"(.*?)""#).expect("valid regex"));

/// Version byte written at the head of `.gi` files.
const GI_FORMAT_VERSION: u8 = 1;

/// Interval of one feature, in contig coordinates and on the flattened axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneInfo {
    /// Contig the feature came from
    pub contig: String,
    /// Contig-relative start
    pub start: u64,
    /// Contig-relative end
    pub end: u64,
    /// Start flattened through the genomic map
    pub flattened_start: i64,
    /// End flattened through the genomic map
    pub flattened_end: i64,
}

/// Feature id to interval map, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct GeneIdMap {
    genes: BTreeMap<String, GeneInfo>,
}

impl GeneIdMap {
    /// Loads a map, choosing the parser from the file extension.
    ///
    /// `.gtf` and `.gtf.gz` files parse as annotation GTF; `.gi` as the binary
    /// form; `.gbed` as the text form. `use_transcript` keys GTF entries by
    /// `transcript_id` rather than `gene_id`, and `drop_version` strips dotted
    /// versions from GTF feature ids.
    pub fn load<P: AsRef<Path>>(
        path: P,
        genomic_map: &GenomicMap,
        use_transcript: bool,
        drop_version: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        if name.ends_with(".gtf") || name.ends_with(".gtf.gz") {
            Self::from_gtf(path, genomic_map, use_transcript, drop_version)
        } else if name.ends_with(".gi") {
            Self::from_gi(path, genomic_map)
        } else if name.ends_with(".gbed") {
            Self::from_gbed(path, genomic_map)
        } else {
            Err(OmicsError::Structural {
                context: "gene map file".to_string(),
                reason: format!("unrecognized extension on '{name}'"),
            })
        }
    }

    /// Parses transcript records from a GTF file.
    ///
    /// Lines that are comments, are not `transcript` records, lack the
    /// requested id attribute, or fail to parse or flatten are skipped. When
    /// an id repeats, the last record wins and the duplicate is logged.
    pub fn from_gtf<P: AsRef<Path>>(
        path: P,
        genomic_map: &GenomicMap,
        use_transcript: bool,
        drop_version: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let lines = Io::default()
            .read_lines(&path)
            .map_err(|e| OmicsError::Storage {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let id_re: &Regex = if use_transcript { &TRANSCRIPT_ID_RE } else { &GENE_ID_RE };

        let mut genes = BTreeMap::new();
        for line in &lines {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.splitn(9, '\t').collect();
            if fields.len() < 9 {
                warn!("Skipping short GTF line: {line}");
                continue;
            }
            if fields[2] != "transcript" {
                continue;
            }
            let Some(captures) = id_re.captures(fields[8]) else {
                warn!("Skipping GTF transcript without an id: {line}");
                continue;
            };
            let mut id = captures.get(1).map_or("", |m| m.as_str()).to_string();
            if drop_version {
                if let Some((bare, _)) = id.split_once('.') {
                    id = bare.to_string();
                }
            }

            let parsed = fields[3]
                .parse::<u64>()
                .ok()
                .zip(fields[4].parse::<u64>().ok())
                .and_then(|(start, end)| {
                    let flattened_start = genomic_map.flatten(fields[0], start).ok()?;
                    let flattened_end = genomic_map.flatten(fields[0], end).ok()?;
                    Some((start, end, flattened_start, flattened_end))
                });
            let Some((start, end, flattened_start, flattened_end)) = parsed else {
                warn!("Skipping GTF transcript with unmappable interval: {line}");
                continue;
            };

            let info = GeneInfo {
                contig: fields[0].to_string(),
                start,
                end,
                flattened_start,
                flattened_end,
            };
            if genes.insert(id.clone(), info).is_some() {
                warn!("Duplicate feature id '{id}' in GTF, keeping the later record");
            }
        }
        Ok(Self { genes })
    }

    /// Reads the binary `.gi` form, flattening each entry's interval.
    pub fn from_gi<P: AsRef<Path>>(path: P, genomic_map: &GenomicMap) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| OmicsError::storage(path, e))?;
        let mut cursor = GiCursor { bytes: &bytes, offset: 0 };

        let version = cursor.take_u8()?;
        if version != GI_FORMAT_VERSION {
            warn!("gi file version {version} not supported, attempting to read anyway");
        }
        let count = cursor.take_u40()?;
        let mut genes = BTreeMap::new();
        for _ in 0..count {
            let name = cursor.take_string()?;
            let contig = cursor.take_string()?;
            let start = cursor.take_u40()?;
            let end = cursor.take_u40()?;
            let flattened_start = genomic_map.flatten(&contig, start)?;
            let flattened_end = genomic_map.flatten(&contig, end)?;
            genes.insert(name, GeneInfo { contig, start, end, flattened_start, flattened_end });
        }
        Ok(Self { genes })
    }

    /// Reads the text `.gbed` form of `name<TAB>contig<TAB>start<TAB>end`
    /// lines, flattening each entry's interval.
    pub fn from_gbed<P: AsRef<Path>>(path: P, genomic_map: &GenomicMap) -> Result<Self> {
        let path = path.as_ref();
        let lines = Io::default()
            .read_lines(&path)
            .map_err(|e| OmicsError::Storage {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut genes = BTreeMap::new();
        for line in &lines {
            if line.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            let parsed = if tokens.len() >= 4 {
                tokens[2].parse::<u64>().ok().zip(tokens[3].parse::<u64>().ok())
            } else {
                None
            };
            let Some((start, end)) = parsed else {
                warn!("Skipping malformed gbed line: {line}");
                continue;
            };
            let contig = tokens[1].to_string();
            let flattened_start = genomic_map.flatten(&contig, start)?;
            let flattened_end = genomic_map.flatten(&contig, end)?;
            genes.insert(
                tokens[0].to_string(),
                GeneInfo { contig, start, end, flattened_start, flattened_end },
            );
        }
        Ok(Self { genes })
    }

    /// Writes the binary `.gi` form, storing contig-relative coordinates.
    pub fn export_as_gi<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = Vec::new();
        out.push(GI_FORMAT_VERSION);
        push_u40(&mut out, self.genes.len() as u64);
        for (name, info) in &self.genes {
            push_string(&mut out, name);
            push_string(&mut out, &info.contig);
            push_u40(&mut out, info.start);
            push_u40(&mut out, info.end);
        }
        let path = path.as_ref();
        fs::write(path, out).map_err(|e| OmicsError::storage(path, e))
    }

    /// Interval for a feature id.
    #[must_use]
    pub fn get(&self, feature_id: &str) -> Option<&GeneInfo> {
        self.genes.get(feature_id)
    }

    /// All features in id order.
    #[must_use]
    pub fn genes(&self) -> &BTreeMap<String, GeneInfo> {
        &self.genes
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns `true` when the map holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

fn push_u40(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes()[..5]);
}

fn push_string(out: &mut Vec<u8>, text: &str) {
    let len = u16::try_from(text.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&text.as_bytes()[..usize::from(len)]);
}

struct GiCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl GiCursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.offset + n;
        if end > self.bytes.len() {
            return Err(OmicsError::Structural {
                context: "gi file".to_string(),
                reason: format!("truncated at byte {}", self.offset),
            });
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u40(&mut self) -> Result<u64> {
        let slice = self.take(5)?;
        let mut buf = [0_u8; 8];
        buf[..5].copy_from_slice(slice);
        Ok(u64::from_le_bytes(buf))
    }

    fn take_string(&mut self) -> Result<String> {
        let len_bytes = self.take(2)?;
        let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]);
        let slice = self.take(usize::from(len))?;
        Ok(String::from_utf8_lossy(slice).into_owned())
    }
}
