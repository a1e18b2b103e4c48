//! Error types for model queries.

use thiserror::Error;

/// Errors a model query can return.
///
/// These are recoverable by design: the resolver treats any of them as
/// "this model failed for this request" and either falls back or degrades
/// to an empty result. None of them should abort the process.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The queried item index is outside the model's rows
    #[error("Item index {index} is outside the model's {len} rows")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Model payload disagrees with its declared shape
    #[error("Model shape mismatch: expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// Query row references columns the index was not fitted on
    #[error("Query row has columns up to {found}, index was fitted on {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The queried item's factor vector has zero norm
    #[error("Item index {index} has a zero-norm factor vector, cosine similarity is undefined")]
    DegenerateVector { index: usize },

    /// The query row is empty under a metric that cannot rank it
    #[error("Query row has zero norm, cosine distance is undefined")]
    ZeroNormQuery,

    /// The model holds no items at all
    #[error("The model contains no items")]
    EmptyModel,
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ModelError>;
