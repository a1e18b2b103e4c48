//! Query traits for the two similarity models.
//!
//! The resolver only ever talks to the models through these traits, so it
//! can be tested with injected fakes (failing models, call counters) and
//! the registry can hold either real models or test doubles.
//!
//! ## Design Note
//! - `Send + Sync` allows the models to be shared across request tasks
//! - Both traits return `Result` so a failing query is a value the caller
//!   branches on, never a panic

use model_store::{ItemIndex, SparseRow};

use crate::error::Result;

/// A scored neighbor in model-internal index space.
///
/// `score` is a similarity for the primary model (higher is closer) and a
/// distance for the fallback index (lower is closer); callers rely on the
/// emission order, not on comparing scores across models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: ItemIndex,
    pub score: f32,
}

/// Latent-factor similarity query (primary model).
pub trait SimilarItems: Send + Sync {
    /// Return up to `n` neighbors of `item`, ordered by descending
    /// similarity. The queried item itself may appear in the list.
    fn similar_items(&self, item: ItemIndex, n: usize) -> Result<Vec<Neighbor>>;
}

/// Feature-row nearest-neighbor query (fallback model).
pub trait NearestNeighbors: Send + Sync {
    /// Return up to `n` nearest neighbors of the query row, ordered by
    /// ascending distance. The row's own item may appear in the list.
    fn nearest(&self, row: SparseRow<'_>, n: usize) -> Result<Vec<Neighbor>>;
}
