//! ALS latent-factor model (primary).
//!
//! Holds the item factor matrix produced by the training pipeline and
//! answers "which items are closest to this one" by cosine similarity over
//! factor rows.
//!
//! ## Algorithm
//! 1. Normalize the queried row by its precomputed L2 norm
//! 2. Score every other row by cosine similarity (parallel)
//! 3. Partition the top N with `select_nth_unstable_by`, then sort that
//!    prefix by descending similarity
//!
//! The queried item scores 1.0 against itself and therefore leads its own
//! neighbor list; self-exclusion is the caller's job.

use rayon::prelude::*;
use tracing::trace;

use model_store::{FactorsArtifact, ItemIndex};

use crate::error::{ModelError, Result};
use crate::traits::{Neighbor, SimilarItems};

/// Read-only ALS item-factor model
#[derive(Debug)]
pub struct AlsModel {
    factors: usize,
    items: usize,
    /// Row-major factor values, `items * factors` entries
    values: Vec<f32>,
    /// Precomputed L2 norm per row
    norms: Vec<f32>,
}

impl AlsModel {
    /// Build the model from a loaded artifact, precomputing row norms.
    ///
    /// Rejects artifacts whose payload disagrees with the declared shape;
    /// the loader validates this too, but the model must not be
    /// constructible in a state its queries cannot handle.
    pub fn from_artifact(artifact: FactorsArtifact) -> Result<Self> {
        let FactorsArtifact {
            factors,
            items,
            values,
        } = artifact;

        if factors == 0 || values.len() != items * factors {
            return Err(ModelError::ShapeMismatch {
                expected: items * factors,
                found: values.len(),
            });
        }

        let norms: Vec<f32> = values
            .par_chunks(factors)
            .map(|row| row.iter().map(|v| v * v).sum::<f32>().sqrt())
            .collect();

        Ok(Self {
            factors,
            items,
            values,
            norms,
        })
    }

    /// Number of item rows
    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Latent dimensionality
    pub fn factors(&self) -> usize {
        self.factors
    }

    /// L2 norm of an item's factor vector, if the index is in range
    pub fn factor_norm(&self, item: ItemIndex) -> Option<f32> {
        self.norms.get(item).copied()
    }

    fn row(&self, item: ItemIndex) -> &[f32] {
        &self.values[item * self.factors..(item + 1) * self.factors]
    }
}

impl SimilarItems for AlsModel {
    fn similar_items(&self, item: ItemIndex, n: usize) -> Result<Vec<Neighbor>> {
        if self.items == 0 {
            return Err(ModelError::EmptyModel);
        }
        if item >= self.items {
            return Err(ModelError::IndexOutOfBounds {
                index: item,
                len: self.items,
            });
        }
        let query_norm = self.norms[item];
        if query_norm == 0.0 {
            return Err(ModelError::DegenerateVector { index: item });
        }

        let query = self.row(item);

        // Score every row; rows with zero norm cannot be ranked by cosine
        // and are dropped.
        let mut scored: Vec<Neighbor> = (0..self.items)
            .into_par_iter()
            .filter_map(|i| {
                let norm = self.norms[i];
                if norm == 0.0 {
                    return None;
                }
                let score = dot(query, self.row(i)) / (query_norm * norm);
                Some(Neighbor { index: i, score })
            })
            .collect();

        let take = n.min(scored.len());
        if take == 0 {
            return Ok(Vec::new());
        }
        scored.select_nth_unstable_by(take.saturating_sub(1), |a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(take);
        scored.sort_unstable_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        trace!(item, n, returned = scored.len(), "ALS similarity query");
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
