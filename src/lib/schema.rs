//! Array schema: cell attributes, storage order, and the genomic map.
//!
//! A schema fixes what each cell of an array carries (typed attributes, fixed or
//! variable length), which dimension varies fastest on disk, and how genomic
//! coordinates flatten onto the position axis. Schemas serialize to a small text
//! file stored next to the array fragments so readers can reopen an array
//! without outside knowledge.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use log::warn;

use crate::errors::{OmicsError, Result};
use crate::genomic_map::{Contig, GenomicMap};

/// File name of the serialized schema inside an array directory.
pub const SCHEMA_FILE_NAME: &str = "omics_schema";

/// Schema format version written by this crate.
pub const SCHEMA_VERSION: &str = "v1";

/// Element type of a cell attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Single byte of text
    Char,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit float
    Float,
}

impl FieldType {
    /// Size in bytes of one element of this type.
    #[must_use]
    pub fn element_size(&self) -> usize {
        match self {
            FieldType::Char | FieldType::UInt8 | FieldType::Int8 => 1,
            FieldType::UInt16 | FieldType::Int16 => 2,
            FieldType::UInt32 | FieldType::Int32 | FieldType::Float => 4,
            FieldType::UInt64 | FieldType::Int64 => 8,
        }
    }

    /// Name used in serialized schemas.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Char => "omics_char",
            FieldType::UInt8 => "omics_uint8_t",
            FieldType::Int8 => "omics_int8_t",
            FieldType::UInt16 => "omics_uint16_t",
            FieldType::Int16 => "omics_int16_t",
            FieldType::UInt32 => "omics_uint32_t",
            FieldType::Int32 => "omics_int32_t",
            FieldType::UInt64 => "omics_uint64_t",
            FieldType::Int64 => "omics_int64_t",
            FieldType::Float => "omics_float_t",
        }
    }

    /// Parses a serialized type name, falling back to `UInt8` for unknown names.
    #[must_use]
    pub fn from_str_lossy(name: &str) -> Self {
        match name {
            "omics_char" => FieldType::Char,
            "omics_uint8_t" => FieldType::UInt8,
            "omics_int8_t" => FieldType::Int8,
            "omics_uint16_t" => FieldType::UInt16,
            "omics_int16_t" => FieldType::Int16,
            "omics_uint32_t" => FieldType::UInt32,
            "omics_int32_t" => FieldType::Int32,
            "omics_uint64_t" => FieldType::UInt64,
            "omics_int64_t" => FieldType::Int64,
            "omics_float_t" => FieldType::Float,
            other => {
                warn!("Unknown field type '{other}', treating as omics_uint8_t");
                FieldType::UInt8
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type and length of one cell attribute.
///
/// A negative length marks the attribute as variable-length; a non-negative
/// length fixes the element count per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Element type
    pub field_type: FieldType,
    /// Element count per cell, negative for variable length
    pub length: i32,
}

impl FieldInfo {
    /// Creates a fixed-length attribute of `length` elements.
    #[must_use]
    pub fn fixed(field_type: FieldType, length: i32) -> Self {
        Self { field_type, length }
    }

    /// Creates a variable-length attribute.
    #[must_use]
    pub fn variable(field_type: FieldType) -> Self {
        Self { field_type, length: -1 }
    }

    /// Returns `true` when the attribute holds a variable number of elements.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.length < 0
    }

    /// Size in bytes of one element.
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.field_type.element_size()
    }

    /// Bytes each cell contributes to a fixed-length attribute buffer, or
    /// `None` for variable-length attributes.
    #[must_use]
    pub fn cell_bytes(&self) -> Option<usize> {
        usize::try_from(self.length).ok().map(|n| n * self.element_size())
    }

    /// Length as written in serialized schemas: the count, or `"variable"`.
    #[must_use]
    pub fn length_to_string(&self) -> String {
        if self.is_variable() { "variable".to_string() } else { self.length.to_string() }
    }
}

/// Which dimension varies fastest in physical cell order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayOrder {
    /// Cells sort by position first; rows are positions
    #[default]
    PositionMajor,
    /// Cells sort by sample first; rows are samples
    SampleMajor,
}

impl ArrayOrder {
    /// Name used in serialized schemas.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayOrder::PositionMajor => "POSITION_MAJOR",
            ArrayOrder::SampleMajor => "SAMPLE_MAJOR",
        }
    }
}

/// Complete description of an array's cells.
///
/// Attribute iteration order is the lexicographic order of attribute names;
/// buffer layouts and field indices all follow that order.
#[derive(Debug, Clone, Default)]
pub struct OmicsSchema {
    /// Physical storage order
    pub order: ArrayOrder,
    /// Cell attributes keyed by name, iterated lexicographically
    pub attributes: BTreeMap<String, FieldInfo>,
    /// Contig layout of the flattened position axis
    pub genomic_map: GenomicMap,
}

impl OmicsSchema {
    /// Creates an empty schema with the given order and genomic map.
    #[must_use]
    pub fn new(order: ArrayOrder, genomic_map: GenomicMap) -> Self {
        Self { order, attributes: BTreeMap::new(), genomic_map }
    }

    /// Returns `true` when cells sort by position first.
    #[must_use]
    pub fn position_major(&self) -> bool {
        self.order == ArrayOrder::PositionMajor
    }

    /// Number of attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Index of an attribute in lexicographic iteration order.
    #[must_use]
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.keys().position(|k| k == name)
    }

    /// Swaps logical (sample, position) coordinates into physical order, or back.
    ///
    /// The swap is its own inverse: applied once it maps canonical coordinates
    /// to storage order, applied again it restores them. Sample-major arrays
    /// already store canonical order, so the call is a no-op for them.
    pub fn swap_order(&self, coords: &mut [i64; 2]) {
        if self.position_major() {
            coords.swap(0, 1);
        }
    }

    /// Serializes the schema to its text form.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(SCHEMA_VERSION);
        out.push('\n');
        out.push_str(self.order.as_str());
        out.push('\n');
        out.push_str(&format!("{}\tattributes\n", self.attributes.len()));
        for (name, info) in &self.attributes {
            out.push_str(&format!(
                "{name}\t{}\t{}\n",
                info.field_type.as_str(),
                info.length_to_string()
            ));
        }
        for contig in self.genomic_map.contigs() {
            out.push_str(&format!(
                "{}\t{}\t{}\n",
                contig.name, contig.length, contig.starting_index
            ));
        }
        out
    }

    /// Parses a schema from its text form.
    ///
    /// An unrecognized version line is logged but tolerated; everything else
    /// is strict.
    pub fn deserialize(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let version = lines.next().ok_or_else(|| structural("schema", "empty schema"))?;
        if version != SCHEMA_VERSION {
            warn!("Schema version '{version}' is not '{SCHEMA_VERSION}', attempting to read anyway");
        }

        let order_line =
            lines.next().ok_or_else(|| structural("schema", "missing order line"))?;
        let order = match order_line {
            "POSITION_MAJOR" => ArrayOrder::PositionMajor,
            "SAMPLE_MAJOR" => ArrayOrder::SampleMajor,
            other => {
                return Err(structural("schema", &format!("unrecognized order '{other}'")));
            }
        };

        let count_line =
            lines.next().ok_or_else(|| structural("schema", "missing attribute count"))?;
        let count: usize = count_line
            .split('\t')
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| {
                structural("schema", &format!("bad attribute count line '{count_line}'"))
            })?;

        let mut attributes = BTreeMap::new();
        for _ in 0..count {
            let line =
                lines.next().ok_or_else(|| structural("schema", "truncated attribute list"))?;
            let mut tokens = line.split('\t');
            let (name, type_name) = match (tokens.next(), tokens.next()) {
                (Some(name), Some(type_name)) => (name, type_name),
                _ => return Err(structural("schema", &format!("bad attribute line '{line}'"))),
            };
            // Anything unparseable as a count is treated as variable length
            let length = tokens.next().and_then(|t| t.parse::<i32>().ok()).unwrap_or(-1);
            attributes.insert(
                name.to_string(),
                FieldInfo { field_type: FieldType::from_str_lossy(type_name), length },
            );
        }

        let mut contigs = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split('\t');
            let contig = match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(name), Some(length), Some(start)) => {
                    let length = length.parse::<u64>().map_err(|_| {
                        structural("schema", &format!("bad contig length in '{line}'"))
                    })?;
                    let starting_index = start.parse::<i64>().map_err(|_| {
                        structural("schema", &format!("bad contig starting index in '{line}'"))
                    })?;
                    Contig { name: name.to_string(), length, starting_index }
                }
                _ => return Err(structural("schema", &format!("bad contig line '{line}'"))),
            };
            contigs.push(contig);
        }

        Ok(Self { order, attributes, genomic_map: GenomicMap::new(contigs) })
    }

    /// Writes the schema file into an array directory.
    pub fn store<P: AsRef<Path>>(&self, array_dir: P) -> Result<()> {
        let path = array_dir.as_ref().join(SCHEMA_FILE_NAME);
        fs::write(&path, self.serialize()).map_err(|e| OmicsError::storage(&path, e))
    }

    /// Reads the schema file from an array directory.
    pub fn load<P: AsRef<Path>>(array_dir: P) -> Result<Self> {
        let path = array_dir.as_ref().join(SCHEMA_FILE_NAME);
        let text = fs::read_to_string(&path).map_err(|e| OmicsError::storage(&path, e))?;
        Self::deserialize(&text)
    }
}

fn structural(context: &str, reason: &str) -> OmicsError {
    OmicsError::Structural { context: context.to_string(), reason: reason.to_string() }
}
