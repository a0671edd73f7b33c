//! Process-wide query sessions over feature-level arrays.
//!
//! A session opens one array read-only and is addressed through an opaque
//! integer handle. The handle table is guarded by one coarse lock, but each
//! lookup snapshots the session under that lock and then queries behind the
//! session's own lock, so concurrent queries on distinct handles never block
//! each other.
//!
//! Feature queries with an explicit id set run one narrow range query per
//! requested feature, since the id codec maps every feature to a contiguous
//! key range. Queries for all features, or sets with ids the codec cannot
//! encode, fall back to a single scan that prunes the candidate set as each
//! feature's run of rows ends and stops once the set is exhausted.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use log::info;
use parking_lot::Mutex;

use crate::cell::FieldData;
use crate::encoder::FeatureEncoder;
use crate::errors::{OmicsError, Result};
use crate::export::OmicsExporter;
use crate::storage::COORDS_PER_CELL;

/// Opaque identifier for an open query session.
pub type OmicsHandle = u64;

/// Callback invoked once per matching cell with the feature id, the sample
/// row, and the score.
pub type FeatureProcessor<'a> = dyn FnMut(&str, u64, f32) -> Result<()> + 'a;

struct Registry {
    next_handle: OmicsHandle,
    sessions: HashMap<OmicsHandle, Arc<Mutex<OmicsExporter>>>,
}

static REGISTRY: LazyLock<Mutex<Registry>> =
    LazyLock::new(|| Mutex::new(Registry { next_handle: 0, sessions: HashMap::new() }));

/// The library version.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Opens `array` under `workspace` and registers a session for it.
///
/// # Errors
/// Fails when the array does not exist or its schema cannot be read.
pub fn connect<P: AsRef<Path>>(workspace: P, array: &str) -> Result<OmicsHandle> {
    let exporter = OmicsExporter::new(workspace, array)?;
    let mut registry = REGISTRY.lock();
    let handle = registry.next_handle;
    registry.next_handle += 1;
    registry.sessions.insert(handle, Arc::new(Mutex::new(exporter)));
    Ok(handle)
}

/// Closes the session behind `handle`. Unknown handles are ignored.
pub fn disconnect(handle: OmicsHandle) {
    REGISTRY.lock().sessions.remove(&handle);
}

/// Streams scores for `features` (all features when empty) whose sample row
/// falls inside the inclusive `sample_range` through `processor`, or into the
/// log when no processor is given. A negative bound on either end of
/// `sample_range` lifts the sample constraint entirely.
///
/// # Errors
/// Fails when `handle` is not connected, the array cannot be read, or the
/// processor fails.
pub fn query_features<'a>(
    handle: OmicsHandle,
    features: &[String],
    sample_range: [i64; 2],
    processor: Option<&'a mut FeatureProcessor<'a>>,
) -> Result<()> {
    let session = REGISTRY.lock().sessions.get(&handle).map(Arc::clone).ok_or_else(|| {
        OmicsError::Structural {
            context: "feature query".to_string(),
            reason: format!("handle {handle} is not connected"),
        }
    })?;
    let mut exporter = session.lock();

    info!("Sample range lo={} hi={}", sample_range[0], sample_range[1]);
    let storage_range = if sample_range[0] < 0 || sample_range[1] < 0 {
        [0, i64::MAX]
    } else {
        sample_range
    };

    let mut state = FeatureState::new(features, sample_range, processor);
    match plan_feature_ranges(features) {
        Some(keys) => {
            for key in keys {
                exporter.query(
                    storage_range,
                    [key, key],
                    Some(&mut |coords: &[i64; COORDS_PER_CELL], fields: &[FieldData]| {
                        state.process(coords, fields)
                    }),
                )?;
                if state.is_done() {
                    break;
                }
            }
            Ok(())
        }
        None => exporter.query(
            storage_range,
            [0, i64::MAX],
            Some(&mut |coords: &[i64; COORDS_PER_CELL], fields: &[FieldData]| {
                state.process(coords, fields)
            }),
        ),
    }
}

/// One inclusive key per requested feature, ascending and deduplicated, or
/// `None` when the set is empty or any id fails to encode. `None` sends the
/// query down the full-scan path.
fn plan_feature_ranges(features: &[String]) -> Option<Vec<i64>> {
    if features.is_empty() {
        return None;
    }
    let mut encoder = FeatureEncoder::new();
    let mut keys = Vec::with_capacity(features.len());
    for feature in features {
        let (key, version) = encoder.encode(feature);
        if (key, version) == (0, 0) {
            return None;
        }
        keys.push(i64::try_from(key).ok()?);
    }
    keys.sort_unstable();
    keys.dedup();
    Some(keys)
}

/// Per-query filter state: the sample bounds, the candidate feature ids still
/// expected to appear, and the feature id of the previous cell.
struct FeatureState<'a> {
    sample_range: [i64; 2],
    candidates: Vec<String>,
    match_all: bool,
    last_seen: Option<String>,
    encoder: FeatureEncoder,
    processor: Option<&'a mut FeatureProcessor<'a>>,
}

impl<'a> FeatureState<'a> {
    fn new(
        features: &[String],
        sample_range: [i64; 2],
        processor: Option<&'a mut FeatureProcessor<'a>>,
    ) -> Self {
        Self {
            sample_range,
            candidates: features.to_vec(),
            match_all: features.is_empty(),
            last_seen: None,
            encoder: FeatureEncoder::new(),
            processor,
        }
    }

    /// Whether a sample row passes the requested bounds. A negative bound on
    /// either end disables the check.
    fn in_range(&self, sample: i64) -> bool {
        let [lo, hi] = self.sample_range;
        lo < 0 || hi < 0 || (lo <= sample && sample <= hi)
    }

    fn is_done(&self) -> bool {
        !self.match_all && self.candidates.is_empty()
    }

    /// Filters one canonical-order cell. The previous feature is dropped from
    /// the candidate set as soon as a different feature's coordinate follows
    /// it; an empty candidate set ends the query.
    fn process(
        &mut self,
        coords: &[i64; COORDS_PER_CELL],
        fields: &[FieldData],
    ) -> Result<ControlFlow<()>> {
        let key = coords[1] as u64;
        let version = u8::try_from(coords[2]).unwrap_or(0);
        let feature = match self.encoder.decode(key, version) {
            Some(feature) => feature,
            None => key.to_string(),
        };

        if !self.match_all {
            if self.last_seen.as_deref() != Some(feature.as_str()) {
                if let Some(last) = self.last_seen.take() {
                    if let Some(idx) = self.candidates.iter().position(|c| *c == last) {
                        self.candidates.remove(idx);
                    }
                    if self.candidates.is_empty() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                self.last_seen = Some(feature.clone());
            }
            if !self.candidates.iter().any(|c| *c == feature) {
                return Ok(ControlFlow::Continue(()));
            }
        }
        if !self.in_range(coords[0]) {
            return Ok(ControlFlow::Continue(()));
        }

        let score = fields
            .first()
            .ok_or_else(|| OmicsError::Structural {
                context: "feature query".to_string(),
                reason: "cell carries no score attribute".to_string(),
            })?
            .get::<f32>(0)?;
        let sample = coords[0] as u64;
        match self.processor.as_mut() {
            Some(processor) => processor(&feature, sample, score)?,
            None => info!("Feature id={feature}, Sample id={sample}, Score={score}"),
        }
        Ok(ControlFlow::Continue(()))
    }
}
