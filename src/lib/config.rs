//! Import configuration: what to load, from where, in which order.
//!
//! A workspace can persist its import settings so later imports and queries
//! agree on inputs and storage order. Callers merge their own settings over
//! the persisted ones, then resolve the result into a validated form the
//! loader consumes.

use std::fs;
use std::path::{Path, PathBuf};

use fgoxide::io::Io;
use serde::{Deserialize, Serialize};

use crate::errors::{OmicsError, Result};

/// File name of the persisted import configuration inside a workspace.
pub const CONFIG_FILE_NAME: &str = "omicsds_import_config";

/// The shape of data an import ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// Alignment records, two cells per mapped read pair
    #[serde(rename = "READ")]
    ReadLevel,
    /// Scored intervals, one cell per endpoint
    #[serde(rename = "INTERVAL")]
    IntervalLevel,
    /// Feature-by-sample matrices, one cell per score
    #[serde(rename = "FEATURE")]
    FeatureLevel,
}

impl ImportKind {
    /// Name used in configuration files and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::ReadLevel => "READ",
            ImportKind::IntervalLevel => "INTERVAL",
            ImportKind::FeatureLevel => "FEATURE",
        }
    }
}

/// Partial import settings; unset fields fall back to the workspace defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Text file listing one input path per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_list: Option<PathBuf>,
    /// Sample name to row index map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_map: Option<PathBuf>,
    /// Contig mapping file for the genomic map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,
    /// What kind of data the inputs hold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_kind: Option<ImportKind>,
    /// Store cells sample-major instead of the default position-major
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_major: Option<bool>,
}

impl ImportConfig {
    /// Overlays `self` on `base`: set fields of `self` win.
    #[must_use]
    pub fn merge_over(self, base: Self) -> Self {
        Self {
            file_list: self.file_list.or(base.file_list),
            sample_map: self.sample_map.or(base.sample_map),
            mapping_file: self.mapping_file.or(base.mapping_file),
            import_kind: self.import_kind.or(base.import_kind),
            sample_major: self.sample_major.or(base.sample_major),
        }
    }

    /// Writes the configuration into a workspace, creating it if needed.
    pub fn store<P: AsRef<Path>>(&self, workspace: P) -> Result<()> {
        let workspace = workspace.as_ref();
        fs::create_dir_all(workspace).map_err(|e| OmicsError::storage(workspace, e))?;
        let path = workspace.join(CONFIG_FILE_NAME);
        let json = serde_json::to_string_pretty(self).map_err(|e| OmicsError::Structural {
            context: "import configuration".to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| OmicsError::storage(&path, e))
    }

    /// Reads the configuration from a workspace, defaulting to empty when no
    /// file exists.
    pub fn load<P: AsRef<Path>>(workspace: P) -> Result<Self> {
        let path = workspace.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| OmicsError::storage(&path, e))?;
        serde_json::from_str(&text).map_err(|e| OmicsError::Structural {
            context: "import configuration".to_string(),
            reason: e.to_string(),
        })
    }

    /// Validates the merged configuration into the form the loader consumes.
    ///
    /// # Errors
    /// Fails when the file list, sample map, or import kind is missing, or
    /// when a read- or interval-level import lacks a mapping file.
    pub fn resolve(self) -> Result<ResolvedImportConfig> {
        let kind = self.import_kind.ok_or_else(|| missing("import_kind"))?;
        let file_list = self.file_list.ok_or_else(|| missing("file_list"))?;
        let sample_map = self.sample_map.ok_or_else(|| missing("sample_map"))?;
        let mapping_file = match kind {
            ImportKind::ReadLevel | ImportKind::IntervalLevel => {
                Some(self.mapping_file.ok_or_else(|| missing("mapping_file"))?)
            }
            ImportKind::FeatureLevel => self.mapping_file,
        };
        Ok(ResolvedImportConfig {
            file_list,
            sample_map,
            mapping_file,
            kind,
            position_major: !self.sample_major.unwrap_or(false),
        })
    }
}

fn missing(field: &str) -> OmicsError {
    OmicsError::Structural {
        context: "import configuration".to_string(),
        reason: format!("required field '{field}' is not set"),
    }
}

/// Fully validated import settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImportConfig {
    /// Text file listing one input path per line
    pub file_list: PathBuf,
    /// Sample name to row index map
    pub sample_map: PathBuf,
    /// Contig mapping file, present for read- and interval-level imports
    pub mapping_file: Option<PathBuf>,
    /// What kind of data the inputs hold
    pub kind: ImportKind,
    /// Whether cells store position-major
    pub position_major: bool,
}

/// Reads a file list: one input path per line, empty lines ignored.
pub fn read_file_list<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let lines = Io::default()
        .read_lines(&path)
        .map_err(|e| OmicsError::Storage {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(lines.iter().filter(|l| !l.is_empty()).map(PathBuf::from).collect())
}
