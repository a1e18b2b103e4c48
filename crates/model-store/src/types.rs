//! Core artifact types for the recommendation service.
//!
//! This module defines the five entities the serving layer consumes:
//! - `ItemMap` / `InverseItemMap`: bidirectional id translation
//! - `FactorsArtifact`: ALS item factors (primary model payload)
//! - `KnnParams`: fallback index parameters
//! - `CsrMatrix`: the sparse interaction matrix (fallback feature rows)
//!
//! All of them are read-only after load. The maps are newtypes rather than
//! bare HashMaps so that presence queries go through `Option`-returning
//! accessors instead of sentinel values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, StoreError};

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up catalog ids with
// model-internal row positions.

/// Caller-visible catalog identifier for an audio item
pub type AudioId = u32;

/// Row position of an item inside the factor matrix and the interaction
/// matrix. Assigned at training time, never caller-visible.
pub type ItemIndex = usize;

// =============================================================================
// Identifier Maps
// =============================================================================

/// Maps catalog ids to model-internal row indices.
///
/// Total over trained items: every item the models know has exactly one
/// entry here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemMap(HashMap<AudioId, ItemIndex>);

impl ItemMap {
    /// Look up the internal index for a catalog id
    pub fn index_of(&self, id: AudioId) -> Option<ItemIndex> {
        self.0.get(&id).copied()
    }

    pub fn contains(&self, id: AudioId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AudioId, ItemIndex)> + '_ {
        self.0.iter().map(|(&id, &idx)| (id, idx))
    }

    /// Verify that `inv` is the exact inverse of this map.
    ///
    /// For every (id, index) pair here, `inv` must map that index back to
    /// the same id, and the two maps must have the same length so neither
    /// side carries extra entries.
    pub fn verify_inverse(&self, inv: &InverseItemMap) -> Result<()> {
        if self.len() != inv.len() {
            return Err(StoreError::ShapeMismatch {
                entity: "inverse item map".to_string(),
                expected: self.len(),
                found: inv.len(),
            });
        }
        for (id, index) in self.iter() {
            let found = inv.id_of(index);
            if found != Some(id) {
                return Err(StoreError::InverseMapMismatch {
                    index,
                    expected: id,
                    found,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(AudioId, ItemIndex)> for ItemMap {
    fn from_iter<T: IntoIterator<Item = (AudioId, ItemIndex)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Maps model-internal row indices back to catalog ids.
///
/// Must be the exact inverse of `ItemMap`; the loader rejects artifact sets
/// where the two disagree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InverseItemMap(HashMap<ItemIndex, AudioId>);

impl InverseItemMap {
    /// Look up the catalog id for an internal index
    pub fn id_of(&self, index: ItemIndex) -> Option<AudioId> {
        self.0.get(&index).copied()
    }

    pub fn contains(&self, index: ItemIndex) -> bool {
        self.0.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ItemIndex, AudioId)> for InverseItemMap {
    fn from_iter<T: IntoIterator<Item = (ItemIndex, AudioId)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// ALS Factor Artifact
// =============================================================================

/// Serialized ALS item factors.
///
/// `values` is row-major: row `i` occupies `values[i * factors..(i + 1) * factors]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorsArtifact {
    /// Latent dimensionality of each item vector
    pub factors: usize,
    /// Number of item rows
    pub items: usize,
    /// Flat row-major factor values, `items * factors` entries
    pub values: Vec<f32>,
}

impl FactorsArtifact {
    /// Check that the declared shape matches the payload
    pub fn validate(&self) -> Result<()> {
        if self.factors == 0 {
            return Err(StoreError::Validation(
                "factor artifact declares zero latent dimensions".to_string(),
            ));
        }
        if self.values.len() != self.items * self.factors {
            return Err(StoreError::ShapeMismatch {
                entity: "factor values".to_string(),
                expected: self.items * self.factors,
                found: self.values.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// KNN Parameter Artifact
// =============================================================================

/// Distance metric used by the fallback nearest-neighbor index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
}

/// Serialized parameters for the fallback index.
///
/// The index itself is fitted at load time against the interaction matrix,
/// so the artifact only carries configuration, not data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KnnParams {
    pub metric: Metric,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
        }
    }
}

// =============================================================================
// Interaction Matrix (CSR)
// =============================================================================

/// Sparse interaction matrix in compressed sparse row layout.
///
/// Rows are items (indexed by `ItemIndex`), columns are interaction features.
/// Row `i` occupies `indices[indptr[i]..indptr[i + 1]]` and the matching
/// slice of `values`; `indices` are column positions sorted within each row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    values: Vec<f32>,
}

/// Borrowed view of a single matrix row
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a> {
    pub indices: &'a [u32],
    pub values: &'a [f32],
}

impl CsrMatrix {
    /// Build a matrix from raw CSR parts, rejecting inconsistent shapes
    pub fn from_parts(
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        values: Vec<f32>,
    ) -> Result<Self> {
        let matrix = Self {
            rows,
            cols,
            indptr,
            indices,
            values,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Check CSR structural invariants:
    /// - `indptr` has `rows + 1` monotone non-decreasing entries
    /// - `indices` and `values` agree with each other and with `indptr`
    /// - every column index is inside the declared width
    pub fn validate(&self) -> Result<()> {
        if self.indptr.len() != self.rows + 1 {
            return Err(StoreError::ShapeMismatch {
                entity: "matrix indptr".to_string(),
                expected: self.rows + 1,
                found: self.indptr.len(),
            });
        }
        if self.indices.len() != self.values.len() {
            return Err(StoreError::ShapeMismatch {
                entity: "matrix values".to_string(),
                expected: self.indices.len(),
                found: self.values.len(),
            });
        }
        if self.indptr.first() != Some(&0) || self.indptr.last() != Some(&self.indices.len()) {
            return Err(StoreError::Validation(
                "matrix indptr does not span the stored entries".to_string(),
            ));
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(StoreError::Validation(
                "matrix indptr is not monotone".to_string(),
            ));
        }
        if self.indices.iter().any(|&col| col as usize >= self.cols) {
            return Err(StoreError::Validation(format!(
                "matrix contains a column index outside width {}",
                self.cols
            )));
        }
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Borrow a single row, or `None` if the index is out of range
    pub fn row(&self, index: ItemIndex) -> Option<SparseRow<'_>> {
        if index >= self.rows {
            return None;
        }
        let start = self.indptr[index];
        let end = self.indptr[index + 1];
        Some(SparseRow {
            indices: &self.indices[start..end],
            values: &self.values[start..end],
        })
    }
}

impl<'a> SparseRow<'a> {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Squared L2 norm of the row
    pub fn norm_sq(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum()
    }
}
