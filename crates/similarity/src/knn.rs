//! Nearest-neighbor index over interaction rows (fallback).
//!
//! Fitted at startup from the KNN parameter artifact plus the interaction
//! matrix; answers "which item rows are closest to this feature row" by
//! cosine or euclidean distance, ascending.
//!
//! The matrix rows are sparse and their column indices are sorted, so row
//! dot products are a two-pointer merge rather than a dense scan.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::trace;

use model_store::{CsrMatrix, KnnParams, Metric, SparseRow};

use crate::error::{ModelError, Result};
use crate::traits::{NearestNeighbors, Neighbor};

/// Read-only nearest-neighbor index over the interaction matrix
#[derive(Debug)]
pub struct KnnIndex {
    matrix: Arc<CsrMatrix>,
    metric: Metric,
    /// Precomputed L2 norm per matrix row
    norms: Vec<f32>,
}

impl KnnIndex {
    /// Fit the index against the interaction matrix.
    ///
    /// Fitting only precomputes row norms; the matrix itself is shared,
    /// not copied.
    pub fn fit(matrix: Arc<CsrMatrix>, params: KnnParams) -> Self {
        let norms: Vec<f32> = (0..matrix.n_rows())
            .into_par_iter()
            .map(|i| {
                matrix
                    .row(i)
                    .map(|row| row.norm_sq().sqrt())
                    .unwrap_or(0.0)
            })
            .collect();

        Self {
            matrix,
            metric: params.metric,
            norms,
        }
    }

    /// Number of indexed rows
    pub fn len(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.n_rows() == 0
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Distance between the query row and one indexed row, or `None` when
    /// the pair cannot be ranked under the metric (zero-norm cosine rows).
    fn distance(&self, query: SparseRow<'_>, query_norm: f32, i: usize) -> Option<f32> {
        let row = self.matrix.row(i)?;
        match self.metric {
            Metric::Cosine => {
                let norm = self.norms[i];
                if norm == 0.0 {
                    return None;
                }
                Some(1.0 - sparse_dot(query, row) / (query_norm * norm))
            }
            Metric::Euclidean => {
                let d2 = query.norm_sq() + self.norms[i] * self.norms[i]
                    - 2.0 * sparse_dot(query, row);
                Some(d2.max(0.0).sqrt())
            }
        }
    }
}

impl NearestNeighbors for KnnIndex {
    fn nearest(&self, row: SparseRow<'_>, n: usize) -> Result<Vec<Neighbor>> {
        if self.matrix.n_rows() == 0 {
            return Err(ModelError::EmptyModel);
        }
        if let Some(&max_col) = row.indices.iter().max() {
            if max_col as usize >= self.matrix.n_cols() {
                return Err(ModelError::DimensionMismatch {
                    expected: self.matrix.n_cols(),
                    found: max_col as usize + 1,
                });
            }
        }

        let query_norm = row.norm_sq().sqrt();
        if self.metric == Metric::Cosine && query_norm == 0.0 {
            return Err(ModelError::ZeroNormQuery);
        }

        let mut scored: Vec<Neighbor> = (0..self.matrix.n_rows())
            .into_par_iter()
            .filter_map(|i| {
                self.distance(row, query_norm, i)
                    .map(|score| Neighbor { index: i, score })
            })
            .collect();

        let take = n.min(scored.len());
        if take == 0 {
            return Ok(Vec::new());
        }
        scored.select_nth_unstable_by(take.saturating_sub(1), |a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(take);
        scored.sort_unstable_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        trace!(n, returned = scored.len(), "KNN fallback query");
        Ok(scored)
    }
}

/// Dot product of two sparse rows with sorted column indices
fn sparse_dot(a: SparseRow<'_>, b: SparseRow<'_>) -> f32 {
    let mut sum = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.indices.len() && j < b.indices.len() {
        match a.indices[i].cmp(&b.indices[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a.values[i] * b.values[j];
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three item rows over four columns:
    /// 0: (0: 1.0, 1: 1.0)
    /// 1: (0: 1.0)
    /// 2: (3: 2.0)
    fn test_matrix() -> Arc<CsrMatrix> {
        Arc::new(
            CsrMatrix::from_parts(
                3,
                4,
                vec![0, 2, 3, 4],
                vec![0, 1, 0, 3],
                vec![1.0, 1.0, 1.0, 2.0],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_ascending_distance_order() {
        let matrix = test_matrix();
        let index = KnnIndex::fit(matrix.clone(), KnnParams::default());

        let query = matrix.row(0).unwrap();
        let neighbors = index.nearest(query, 3).unwrap();

        // Row 0 is identical (distance 0), row 1 shares one column,
        // row 2 shares nothing (cosine distance 1).
        let indices: Vec<_> = neighbors.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        for pair in neighbors.windows(2) {
            assert!(pair[0].score <= pair[1].score, "Order must be ascending");
        }
        assert!(neighbors[0].score.abs() < 1e-6);
    }

    #[test]
    fn test_truncates_to_n() {
        let matrix = test_matrix();
        let index = KnnIndex::fit(matrix.clone(), KnnParams::default());

        let neighbors = index.nearest(matrix.row(0).unwrap(), 2).unwrap();
        assert_eq!(neighbors.len(), 2);
    }

    #[test]
    fn test_euclidean_metric() {
        let matrix = test_matrix();
        let index = KnnIndex::fit(
            matrix.clone(),
            KnnParams {
                metric: Metric::Euclidean,
            },
        );

        let neighbors = index.nearest(matrix.row(1).unwrap(), 3).unwrap();
        assert_eq!(neighbors[0].index, 1, "Identical row sorts first");
        assert!(neighbors[0].score.abs() < 1e-6);

        // Row 0 is at distance 1, row 2 at sqrt(1 + 4)
        assert_eq!(neighbors[1].index, 0);
        assert!((neighbors[1].score - 1.0).abs() < 1e-6);
        assert_eq!(neighbors[2].index, 2);
        assert!((neighbors[2].score - 5.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_zero_norm_cosine_query_is_an_error() {
        let matrix = test_matrix();
        let index = KnnIndex::fit(matrix, KnnParams::default());

        let empty = SparseRow {
            indices: &[],
            values: &[],
        };
        assert!(matches!(index.nearest(empty, 3), Err(ModelError::ZeroNormQuery)));
    }

    #[test]
    fn test_zero_norm_euclidean_query_is_ranked() {
        let matrix = test_matrix();
        let index = KnnIndex::fit(
            matrix,
            KnnParams {
                metric: Metric::Euclidean,
            },
        );

        let empty = SparseRow {
            indices: &[],
            values: &[],
        };
        let neighbors = index.nearest(empty, 3).unwrap();
        assert_eq!(neighbors.len(), 3);
        // Nearest to the origin is the single-entry unit row
        assert_eq!(neighbors[0].index, 1);
    }

    #[test]
    fn test_query_outside_fitted_width_is_an_error() {
        let matrix = test_matrix();
        let index = KnnIndex::fit(matrix, KnnParams::default());

        let wide = SparseRow {
            indices: &[7],
            values: &[1.0],
        };
        assert!(matches!(
            index.nearest(wide, 3),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_index_is_an_error() {
        let matrix = Arc::new(CsrMatrix::from_parts(0, 4, vec![0], vec![], vec![]).unwrap());
        let index = KnnIndex::fit(matrix, KnnParams::default());

        let query = SparseRow {
            indices: &[0],
            values: &[1.0],
        };
        assert!(matches!(index.nearest(query, 3), Err(ModelError::EmptyModel)));
    }

    #[test]
    fn test_sparse_dot_merges_sorted_indices() {
        let a = SparseRow {
            indices: &[0, 2, 5],
            values: &[1.0, 2.0, 3.0],
        };
        let b = SparseRow {
            indices: &[2, 3, 5],
            values: &[4.0, 9.0, 0.5],
        };
        assert!((sparse_dot(a, b) - 9.5).abs() < 1e-6);
    }
}
