//! Cells and their attribute payloads.
//!
//! A cell is one entry of an array: a coordinate pair plus one payload per
//! schema attribute. Payloads are raw little-endian bytes; typed access goes
//! through bounds-checked accessors rather than a tagged union, which keeps
//! buffering and storage byte-oriented end to end.

use crate::errors::{OmicsError, Result};
use crate::schema::OmicsSchema;

/// Scalar element types that can live in a [`FieldData`] payload.
pub trait CellElement: Copy {
    /// Size in bytes of one element.
    const SIZE: usize;

    /// Appends the little-endian bytes of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Reads one element from exactly `SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_cell_element {
    ($($t:ty),* $(,)?) => {$(
        impl CellElement for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                Self::from_le_bytes(buf)
            }
        }
    )*};
}

impl_cell_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32);

/// Raw attribute payload of a single cell.
///
/// Holds the little-endian byte image of zero or more elements of one schema
/// attribute. The byte length divided by the element size gives the element
/// count; [`get`](FieldData::get) checks bounds against that count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldData {
    data: Vec<u8>,
}

impl FieldData {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing bytes as a payload.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Builds a payload holding a single element.
    #[must_use]
    pub fn from_value<T: CellElement>(value: T) -> Self {
        let mut field = Self::new();
        field.push(value);
        field
    }

    /// Builds a payload from the bytes of a string.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self { data: text.as_bytes().to_vec() }
    }

    /// Raw bytes of the payload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte length of the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the payload holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole elements of type `T` in the payload.
    #[must_use]
    pub fn typed_len<T: CellElement>(&self) -> usize {
        self.data.len() / T::SIZE
    }

    /// Reads element `idx` of the payload as a `T`.
    ///
    /// # Errors
    /// Fails with [`OmicsError::Range`] when `idx` is at or past the element
    /// count for `T`.
    pub fn get<T: CellElement>(&self, idx: usize) -> Result<T> {
        let typed_len = self.typed_len::<T>();
        if idx >= typed_len {
            return Err(OmicsError::Range {
                reason: format!(
                    "field element index {idx} out of bounds for {typed_len} elements"
                ),
            });
        }
        let start = idx * T::SIZE;
        Ok(T::read_le(&self.data[start..start + T::SIZE]))
    }

    /// Decodes every whole element of the payload, dropping trailing partial
    /// bytes the way [`typed_len`](FieldData::typed_len) does.
    #[must_use]
    pub fn elements<T: CellElement>(&self) -> Vec<T> {
        (0..self.typed_len::<T>())
            .map(|idx| T::read_le(&self.data[idx * T::SIZE..(idx + 1) * T::SIZE]))
            .collect()
    }

    /// Appends one element.
    pub fn push<T: CellElement>(&mut self, value: T) {
        value.write_le(&mut self.data);
    }

    /// Appends every element of a slice.
    pub fn push_slice<T: CellElement>(&mut self, values: &[T]) {
        self.data.reserve(values.len() * T::SIZE);
        for value in values {
            value.write_le(&mut self.data);
        }
    }

    /// Appends raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}

/// One array entry: physical coordinates plus per-attribute payloads.
///
/// `fields` is indexed by the schema's lexicographic attribute order. The
/// version byte carries the feature id version for feature-level cells and
/// stays zero otherwise. `file_idx` remembers which reader produced the cell
/// so the import loop can pull that reader's next record; cells synthesized
/// without an origin (such as interval end cells) carry `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OmicsCell {
    /// Coordinates in the schema's physical order
    pub coords: [i64; 2],
    /// Attribute payloads in schema attribute order
    pub fields: Vec<FieldData>,
    /// Feature id version byte, zero outside feature-level imports
    pub version: u8,
    /// Index of the originating reader, if any
    pub file_idx: Option<usize>,
}

impl OmicsCell {
    /// Creates a cell with empty payloads for `field_count` attributes.
    #[must_use]
    pub fn new(coords: [i64; 2], field_count: usize, file_idx: Option<usize>) -> Self {
        Self { coords, fields: vec![FieldData::new(); field_count], version: 0, file_idx }
    }

    /// Payload of attribute `idx`, if the cell carries that many fields.
    #[must_use]
    pub fn field(&self, idx: usize) -> Option<&FieldData> {
        self.fields.get(idx)
    }

    /// Mutable payload of attribute `idx`.
    pub fn field_mut(&mut self, idx: usize) -> Option<&mut FieldData> {
        self.fields.get_mut(idx)
    }

    /// Stores `data` under the attribute named `name`, resolved through the
    /// schema. Returns `false` without touching the cell when the schema has
    /// no such attribute.
    pub fn add_field(&mut self, schema: &OmicsSchema, name: &str, data: FieldData) -> bool {
        match schema.attribute_index(name).and_then(|idx| self.fields.get_mut(idx)) {
            Some(slot) => {
                *slot = data;
                true
            }
            None => false,
        }
    }
}
