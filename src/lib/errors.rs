//! Custom error types for omicsds operations.

use thiserror::Error;

/// Result type alias for omicsds operations
pub type Result<T> = std::result::Result<T, OmicsError>;

/// Error type for omicsds operations
#[derive(Error, Debug)]
pub enum OmicsError {
    /// Underlying I/O failure while accessing workspace or array storage
    #[error("Storage I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Workspace or array storage is missing or laid out incorrectly
    #[error("Storage error at '{path}': {reason}")]
    Storage {
        /// Path to the workspace, array, or fragment involved
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Input violates the structure an array or file format requires
    #[error("Invalid {context}: {reason}")]
    Structural {
        /// What was being read (e.g., "schema", "matrix row", "cell order")
        context: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Typed access beyond a field's byte extent, or a malformed query range
    #[error("Range error: {reason}")]
    Range {
        /// Explanation of what fell out of range
        reason: String,
    },

    /// A single record could not be parsed; callers usually warn and skip
    #[error("Could not parse {context}: {reason}")]
    Parse {
        /// What was being parsed (e.g., "BED line", "sample map entry")
        context: String,
        /// Explanation of the problem
        reason: String,
    },
}

impl OmicsError {
    /// Builds a [`OmicsError::Storage`] from a path and an I/O error.
    pub fn storage(path: impl AsRef<std::path::Path>, error: std::io::Error) -> Self {
        Self::Storage { path: path.as_ref().display().to_string(), reason: error.to_string() }
    }
}
