//! Packing Ensembl-style feature ids into integer keys.
//!
//! Feature-level arrays index one dimension by feature id. Ids like
//! `ENST00000456328.1` pack into a `u64` key plus a `u8` version so they can
//! serve as array coordinates: the numeral occupies the low 48 bits, the kind
//! prefix byte 48-55, and the organism byte 56-63. Encoding and decoding keep
//! per-direction caches so repeated lookups during import and export stay cheap.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Feature id shape: kind prefix, organism letters, 11-digit numeral,
/// optional dotted version.
static FEATURE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{4})([A-Za-z]*)(\d{11})([.]*)(\d*)$").expect("valid regex")
});

/// Known feature kind prefixes and their key bytes.
const KIND_CODES: [(&str, u8); 3] = [("ENST", 0), ("ENSG", 1), ("ENSE", 2)];

/// Known organism infixes and their key bytes.
const ORGANISM_CODES: [(&str, u8); 2] = [("", 0), ("MU", 1)];

/// Low 48 bits of a key hold the numeral.
const NUMERAL_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// Width of the zero-padded numeral in a feature id.
const NUMERAL_DIGITS: usize = 11;

/// Two-way codec between feature id strings and (key, version) pairs.
///
/// Unencodable ids map to the sentinel `(0, 0)`; versions longer than three
/// digits or above 255 make the whole id unencodable. The caches remember
/// only successful conversions, one per direction.
#[derive(Debug, Default)]
pub struct FeatureEncoder {
    encodings: HashMap<String, (u64, u8)>,
    decodings: HashMap<u64, String>,
}

impl FeatureEncoder {
    /// Creates an encoder with empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a feature id, returning `(0, 0)` when the id does not fit the
    /// expected shape.
    pub fn encode(&mut self, feature_id: &str) -> (u64, u8) {
        if let Some(&encoded) = self.encodings.get(feature_id) {
            return encoded;
        }
        let Some(encoded) = encode_uncached(feature_id) else {
            return (0, 0);
        };
        self.encodings.insert(feature_id.to_string(), encoded);
        encoded
    }

    /// Decodes a key and version back to the feature id string, or `None`
    /// when the key carries an unknown kind or organism byte.
    pub fn decode(&mut self, key: u64, version: u8) -> Option<String> {
        let kind_byte = ((key >> 48) & 0xFF) as u8;
        let organism_byte = ((key >> 56) & 0xFF) as u8;
        let kind = KIND_CODES.iter().find(|(_, code)| *code == kind_byte)?.0;
        let organism = ORGANISM_CODES.iter().find(|(_, code)| *code == organism_byte)?.0;

        let numeral = key & NUMERAL_MASK;
        let mut feature_id =
            format!("{kind}{organism}{numeral:0width$}", width = NUMERAL_DIGITS);
        if version != 0 {
            feature_id.push('.');
            feature_id.push_str(&version.to_string());
        }
        self.decodings.insert(key, feature_id.clone());
        Some(feature_id)
    }

    /// Looks up a previously encoded id in the cache.
    #[must_use]
    pub fn find_encoding(&self, feature_id: &str) -> Option<(u64, u8)> {
        self.encodings.get(feature_id).copied()
    }

    /// Looks up a previously decoded key in the cache.
    #[must_use]
    pub fn find_decoding(&self, key: u64) -> Option<&str> {
        self.decodings.get(&key).map(String::as_str)
    }
}

fn encode_uncached(feature_id: &str) -> Option<(u64, u8)> {
    let captures = FEATURE_ID_RE.captures(feature_id)?;
    let kind = captures.get(1).map_or("", |m| m.as_str());
    let organism = captures.get(2).map_or("", |m| m.as_str());
    let numeral_text = captures.get(3).map_or("", |m| m.as_str());
    let version_text = captures.get(5).map_or("", |m| m.as_str());

    let kind_code = KIND_CODES.iter().find(|(prefix, _)| *prefix == kind)?.1;
    let organism_code = ORGANISM_CODES.iter().find(|(infix, _)| *infix == organism)?.1;
    let numeral: u64 = numeral_text.parse().ok()?;

    let version = if version_text.is_empty() {
        0
    } else if version_text.len() > 3 {
        return None;
    } else {
        u8::try_from(version_text.parse::<u32>().ok()?).ok()?
    };

    let key = u64::from(organism_code) << 56 | u64::from(kind_code) << 48 | numeral;
    Some((key, version))
}
