//! SAM regeneration from a read-level array.
//!
//! Each queried sample row becomes one output file holding the eleven
//! standard alignment columns, reconstructed from the stored attributes.
//! Mate reference ids come back as the numeric ids the import stored, not
//! re-resolved names.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::Path;

use fgoxide::io::Io;

use crate::cell::FieldData;
use crate::config::ImportKind;
use crate::errors::{OmicsError, Result};
use crate::export::OmicsExporter;
use crate::genomic_map::GenomicMap;
use crate::logging::OperationTimer;
use crate::readers::create_schema;
use crate::schema::OmicsSchema;

/// CIGAR symbols indexed by packed operation code.
const CIGAR_CODES: &[u8; 9] = b"MIDNSHP=X";

/// Rebuilds CIGAR text from packed operations. Each word holds the operation
/// code in its low four bits and the length above them.
///
/// # Errors
/// Fails with [`OmicsError::Structural`] on an operation code past the known
/// symbols.
pub fn cigar_to_string(ops: &[u32]) -> Result<String> {
    let mut text = String::with_capacity(ops.len() * 4);
    for &op in ops {
        let code = (op & 0xF) as usize;
        let Some(&symbol) = CIGAR_CODES.get(code) else {
            return Err(OmicsError::Structural {
                context: "CIGAR field".to_string(),
                reason: format!("operation code {code} has no CIGAR symbol"),
            });
        };
        text.push_str(&(op >> 4).to_string());
        text.push(symbol as char);
    }
    Ok(text)
}

/// Attribute indices for the eleven printed alignment columns.
struct SamFieldIndices {
    qname: usize,
    flag: usize,
    rname: usize,
    pos: usize,
    mapq: usize,
    cigar: usize,
    rnext: usize,
    pnext: usize,
    tlen: usize,
    seq: usize,
    qual: usize,
}

impl SamFieldIndices {
    fn resolve(schema: &OmicsSchema) -> Result<Self> {
        let index = |name: &str| {
            schema.attribute_index(name).ok_or_else(|| OmicsError::Structural {
                context: "read-level schema".to_string(),
                reason: format!("attribute '{name}' is missing"),
            })
        };
        Ok(Self {
            qname: index("QNAME")?,
            flag: index("FLAG")?,
            rname: index("RNAME")?,
            pos: index("POS")?,
            mapq: index("MAPQ")?,
            cigar: index("CIGAR")?,
            rnext: index("RNEXT")?,
            pnext: index("PNEXT")?,
            tlen: index("TLEN")?,
            seq: index("SEQ")?,
            qual: index("QUAL")?,
        })
    }
}

/// Exporter that writes one SAM file per sample row.
pub struct SamExporter {
    exporter: OmicsExporter,
    fields: SamFieldIndices,
}

impl fmt::Debug for SamExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamExporter").finish_non_exhaustive()
    }
}

impl SamExporter {
    /// Opens a read-level array for SAM export.
    ///
    /// # Errors
    /// Fails when the array cannot be opened or its schema does not carry
    /// the full read-level attribute set.
    pub fn new<P: AsRef<Path>>(workspace: P, array: &str) -> Result<Self> {
        let exporter = OmicsExporter::new(workspace, array)?;
        // The array must carry every attribute the read-level import writes
        let required =
            create_schema(ImportKind::ReadLevel, exporter.schema().order, GenomicMap::default());
        for (name, info) in &required.attributes {
            exporter.check(name, *info)?;
        }
        let fields = SamFieldIndices::resolve(exporter.schema())?;
        Ok(Self { exporter, fields })
    }

    /// Queries the inclusive sample and position ranges and writes each
    /// sample row's records to `<output_prefix><row>.sam`. Returns the
    /// number of records written.
    ///
    /// # Errors
    /// Fails when the query, an output file, or a stored record fails.
    pub fn export_sams(
        &mut self,
        sample_range: [i64; 2],
        position_range: [i64; 2],
        output_prefix: &str,
    ) -> Result<u64> {
        let timer = OperationTimer::new("SAM export");
        let io = Io::default();
        let fields = &self.fields;
        let mut files: HashMap<i64, BufWriter<Box<dyn Write + Send>>> = HashMap::new();
        let mut written = 0_u64;

        self.exporter.query(
            sample_range,
            position_range,
            Some(&mut |coords: &[i64; 3], data: &[FieldData]| {
                let row = coords[0];
                let file = match files.entry(row) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let path = format!("{output_prefix}{row}.sam");
                        let writer = io.new_writer(&path).map_err(|e| OmicsError::Storage {
                            path: path.clone(),
                            reason: e.to_string(),
                        })?;
                        entry.insert(writer)
                    }
                };
                write_sam_record(file, fields, data)?;
                written += 1;
                Ok(ControlFlow::Continue(()))
            }),
        )?;

        for writer in files.values_mut() {
            writer.flush()?;
        }
        timer.log_completion(written);
        Ok(written)
    }
}

/// Writes one tab-separated alignment line from a stored cell's payloads.
fn write_sam_record<W: Write>(
    out: &mut W,
    fields: &SamFieldIndices,
    data: &[FieldData],
) -> Result<()> {
    out.write_all(data[fields.qname].bytes())?;
    write!(out, "\t{}\t", data[fields.flag].get::<u16>(0)?)?;
    out.write_all(data[fields.rname].bytes())?;
    write!(out, "\t{}", data[fields.pos].get::<i32>(0)?)?;
    write!(out, "\t{}", data[fields.mapq].get::<u8>(0)?)?;
    write!(out, "\t{}", cigar_to_string(&data[fields.cigar].elements::<u32>())?)?;
    write!(out, "\t{}", data[fields.rnext].get::<i32>(0)?)?;
    write!(out, "\t{}", data[fields.pnext].get::<i32>(0)?)?;
    write!(out, "\t{}\t", data[fields.tlen].get::<i32>(0)?)?;
    out.write_all(data[fields.seq].bytes())?;
    out.write_all(b"\t")?;
    out.write_all(data[fields.qual].bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}
