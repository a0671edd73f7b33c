//! Read-level cells from SAM files.
//!
//! Every mapped record becomes a cell at its alignment start; when the record
//! carries a template length, a second cell marks the template end so range
//! queries can see both endpoints. All twelve read-level attributes store the
//! record's SAM text forms, with CIGAR kept as packed ops.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use bstr::ByteSlice;
use fgoxide::io::Io;
use log::debug;
use noodles::sam;
use noodles::sam::alignment::record::cigar::op::{Kind, Op};
use noodles::sam::alignment::RecordBuf;
use noodles::sam::Header;

use crate::cell::{FieldData, OmicsCell};
use crate::errors::{OmicsError, Result};
use crate::readers::CellReader;
use crate::sample_map::SampleMap;
use crate::schema::OmicsSchema;

/// Offset between raw quality scores and their SAM text form.
const QUALITY_OFFSET: u8 = 33;

/// Attribute indices resolved against the read-level schema.
struct ReadFieldIndices {
    sample_name: usize,
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

impl ReadFieldIndices {
    fn resolve(schema: &OmicsSchema) -> Result<Self> {
        let index = |name: &str| {
            schema.attribute_index(name).ok_or_else(|| OmicsError::Structural {
                context: "read-level schema".to_string(),
                reason: format!("attribute '{name}' is missing"),
            })
        };
        Ok(Self {
            sample_name: index("SAMPLE_NAME")?,
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

/// Reader that yields read-level cells from one SAM file.
///
/// The sample is the file's last path component looked up in the sample map;
/// a missing entry fails construction. Unmapped records are skipped.
pub struct SamCellReader {
    reader: sam::io::Reader<Box<dyn BufRead + Send>>,
    header: Header,
    record: RecordBuf,
    schema: Arc<OmicsSchema>,
    fields: ReadFieldIndices,
    sample_name: String,
    sample_row: i64,
    file_idx: usize,
}

impl SamCellReader {
    /// Opens a SAM file and reads its header.
    pub fn new(
        path: &Path,
        file_idx: usize,
        schema: Arc<OmicsSchema>,
        sample_map: &SampleMap,
    ) -> Result<Self> {
        let sample_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sample_row = sample_map.row(&sample_name).ok_or_else(|| {
            OmicsError::Structural {
                context: "sample map".to_string(),
                reason: format!("sample '{sample_name}' has no row index"),
            }
        })?;
        let inner = Io::default().new_reader(&path).map_err(|e| OmicsError::Storage {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut reader = sam::io::Reader::new(inner);
        let header = reader.read_header()?;
        let fields = ReadFieldIndices::resolve(&schema)?;
        #[allow(clippy::cast_possible_wrap)]
        Ok(Self {
            reader,
            header,
            record: RecordBuf::default(),
            schema,
            fields,
            sample_name,
            sample_row: sample_row as i64,
            file_idx,
        })
    }

    fn build_cells(&self) -> Result<Option<Vec<OmicsCell>>> {
        let (Some(reference_sequence_id), Some(alignment_start)) =
            (self.record.reference_sequence_id(), self.record.alignment_start())
        else {
            debug!("Skipping unmapped record in '{}'", self.sample_name);
            return Ok(None);
        };
        let Some((reference_name, _)) =
            self.header.reference_sequences().get_index(reference_sequence_id)
        else {
            debug!("Skipping record with out-of-header reference in '{}'", self.sample_name);
            return Ok(None);
        };

        let pos = usize::from(alignment_start);
        let position = self
            .schema
            .genomic_map
            .flatten(&reference_name.to_str_lossy(), (pos - 1) as u64)?;

        let mut cell = OmicsCell::new(
            [self.sample_row, position],
            self.schema.attribute_count(),
            Some(self.file_idx),
        );
        self.fill_fields(&mut cell, pos, reference_name.to_vec());

        let tlen = self.record.template_length();
        if tlen == 0 {
            return Ok(Some(vec![cell]));
        }
        let mut end_cell = cell.clone();
        end_cell.coords[1] = position + (i64::from(tlen).abs() - 1);
        end_cell.file_idx = None;
        Ok(Some(vec![cell, end_cell]))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn fill_fields(&self, cell: &mut OmicsCell, pos: usize, reference_name: Vec<u8>) {
        let record = &self.record;
        let fields = &self.fields;

        cell.fields[fields.sample_name] = FieldData::from_text(&self.sample_name);
        cell.fields[fields.qname] =
            FieldData::from_bytes(record.name().map_or_else(|| b"*".to_vec(), |n| n.to_vec()));
        cell.fields[fields.flag] = FieldData::from_value(record.flags().bits());
        cell.fields[fields.rname] = FieldData::from_bytes(reference_name);
        cell.fields[fields.pos] = FieldData::from_value(pos as i32);
        cell.fields[fields.mapq] =
            FieldData::from_value(record.mapping_quality().map_or(255, u8::from));

        let mut cigar = FieldData::new();
        for op in record.cigar().as_ref() {
            cigar.push(encode_cigar_op(*op));
        }
        cell.fields[fields.cigar] = cigar;

        cell.fields[fields.rnext] = FieldData::from_value(
            record.mate_reference_sequence_id().map_or(-1_i32, |id| id as i32),
        );
        cell.fields[fields.pnext] = FieldData::from_value(
            record.mate_alignment_start().map_or(0_i32, |p| usize::from(p) as i32),
        );
        cell.fields[fields.tlen] = FieldData::from_value(record.template_length());

        let sequence = record.sequence().as_ref();
        cell.fields[fields.seq] = if sequence.is_empty() {
            FieldData::from_text("*")
        } else {
            FieldData::from_bytes(sequence.to_vec())
        };
        let quality = record.quality_scores().as_ref();
        cell.fields[fields.qual] = if quality.is_empty() {
            FieldData::from_text("*")
        } else {
            FieldData::from_bytes(quality.iter().map(|q| q + QUALITY_OFFSET).collect())
        };
    }
}

impl CellReader for SamCellReader {
    fn next_cells(&mut self) -> Result<Vec<OmicsCell>> {
        loop {
            if self.reader.read_record_buf(&self.header, &mut self.record)? == 0 {
                return Ok(Vec::new());
            }
            if let Some(cells) = self.build_cells()? {
                return Ok(cells);
            }
        }
    }
}

/// Packs a CIGAR op into the standard length-and-code word.
#[allow(clippy::cast_possible_truncation)]
fn encode_cigar_op(op: Op) -> u32 {
    let code = match op.kind() {
        Kind::Match => 0,
        Kind::Insertion => 1,
        Kind::Deletion => 2,
        Kind::Skip => 3,
        Kind::SoftClip => 4,
        Kind::HardClip => 5,
        Kind::Pad => 6,
        Kind::SequenceMatch => 7,
        Kind::SequenceMismatch => 8,
    };
    (op.len() as u32) << 4 | code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportKind;
    use crate::genomic_map::{Contig, GenomicMap};
    use crate::readers::create_schema;
    use crate::schema::ArrayOrder;
    use std::io::Write;
    use tempfile::TempDir;

    const SAM: &str = "\
@HD\tVN:1.6
@SQ\tSN:chr1\tLN:1000
read1\t99\tchr1\t100\t60\t4M\t=\t150\t54\tACGT\tIIII
read2\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII
read3\t0\tchr1\t200\t60\t2M2S\t*\t0\t0\tACGT\tIIII
";

    fn reader_fixture(dir: &TempDir) -> (SamCellReader, Arc<OmicsSchema>) {
        let sam_path = dir.path().join("small.sam");
        std::fs::File::create(&sam_path).unwrap().write_all(SAM.as_bytes()).unwrap();
        let map_path = dir.path().join("samples.map");
        std::fs::File::create(&map_path).unwrap().write_all(b"small.sam\t3\n").unwrap();

        let genomic_map = GenomicMap::new(vec![Contig {
            name: "chr1".to_string(),
            length: 1000,
            starting_index: 0,
        }]);
        let schema = Arc::new(create_schema(
            ImportKind::ReadLevel,
            ArrayOrder::PositionMajor,
            genomic_map,
        ));
        let sample_map = SampleMap::from_file(&map_path).unwrap();
        let reader = SamCellReader::new(&sam_path, 0, Arc::clone(&schema), &sample_map).unwrap();
        (reader, schema)
    }

    #[test]
    fn test_mapped_record_with_template_yields_two_cells() {
        let dir = TempDir::new().unwrap();
        let (mut reader, schema) = reader_fixture(&dir);

        let cells = reader.next_cells().unwrap();
        assert_eq!(cells.len(), 2);

        let start = &cells[0];
        assert_eq!(start.coords, [3, 99]);
        assert_eq!(start.file_idx, Some(0));
        let end = &cells[1];
        assert_eq!(end.coords, [3, 99 + 54 - 1]);
        assert_eq!(end.file_idx, None);

        let fields = ReadFieldIndices::resolve(&schema).unwrap();
        assert_eq!(start.fields[fields.sample_name].bytes(), b"small.sam");
        assert_eq!(start.fields[fields.qname].bytes(), b"read1");
        assert_eq!(start.fields[fields.flag].get::<u16>(0).unwrap(), 99);
        assert_eq!(start.fields[fields.rname].bytes(), b"chr1");
        assert_eq!(start.fields[fields.pos].get::<i32>(0).unwrap(), 100);
        assert_eq!(start.fields[fields.mapq].get::<u8>(0).unwrap(), 60);
        assert_eq!(start.fields[fields.cigar].get::<u32>(0).unwrap(), 4 << 4);
        assert_eq!(start.fields[fields.rnext].get::<i32>(0).unwrap(), 0);
        assert_eq!(start.fields[fields.pnext].get::<i32>(0).unwrap(), 150);
        assert_eq!(start.fields[fields.tlen].get::<i32>(0).unwrap(), 54);
        assert_eq!(start.fields[fields.seq].bytes(), b"ACGT");
        assert_eq!(start.fields[fields.qual].bytes(), b"IIII");
    }

    #[test]
    fn test_unmapped_record_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (mut reader, schema) = reader_fixture(&dir);

        reader.next_cells().unwrap();
        // read2 is unmapped, so the next batch comes from read3
        let cells = reader.next_cells().unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].coords, [3, 199]);

        let fields = ReadFieldIndices::resolve(&schema).unwrap();
        assert_eq!(cells[0].fields[fields.cigar].get::<u32>(0).unwrap(), 2 << 4);
        assert_eq!(cells[0].fields[fields.cigar].get::<u32>(1).unwrap(), 2 << 4 | 4);
        assert_eq!(cells[0].fields[fields.rnext].get::<i32>(0).unwrap(), -1);

        // End of file
        assert!(reader.next_cells().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_sample_fails_construction() {
        let dir = TempDir::new().unwrap();
        let sam_path = dir.path().join("other.sam");
        std::fs::File::create(&sam_path).unwrap().write_all(SAM.as_bytes()).unwrap();
        let map_path = dir.path().join("samples.map");
        std::fs::File::create(&map_path).unwrap().write_all(b"small.sam\t3\n").unwrap();

        let schema = Arc::new(create_schema(
            ImportKind::ReadLevel,
            ArrayOrder::PositionMajor,
            GenomicMap::default(),
        ));
        let sample_map = SampleMap::from_file(&map_path).unwrap();
        assert!(SamCellReader::new(&sam_path, 0, schema, &sample_map).is_err());
    }
}
