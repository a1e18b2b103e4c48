//! Error types for the model-store crate.

use thiserror::Error;

/// Errors that can occur while discovering, reading, or validating artifacts.
///
/// Every variant carries enough context to name the offending artifact in a
/// log line. The loader fails closed: any of these aborts the whole load.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No file in the directory matched the artifact pattern
    #[error("No artifact matching {pattern} in {dir}")]
    ArtifactNotFound { dir: String, pattern: String },

    /// I/O error occurred while scanning a directory or reading a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact file could not be deserialized
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Declared shape of an artifact does not match its payload
    #[error("Shape mismatch in {entity}: expected {expected}, found {found}")]
    ShapeMismatch {
        entity: String,
        expected: usize,
        found: usize,
    },

    /// The inverse item map disagrees with the forward map
    #[error("Inverse map mismatch at index {index}: expected id {expected}, found {found:?}")]
    InverseMapMismatch {
        index: usize,
        expected: u32,
        found: Option<u32>,
    },

    /// Cross-artifact validation failed
    #[error("Artifact validation failed: {0}")]
    Validation(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
