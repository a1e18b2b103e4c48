//! # Similarity Crate
//!
//! This crate implements the two neighbor-query models behind the
//! recommendation resolver.
//!
//! ## Components
//!
//! ### ALS Model (Primary)
//! Latent-factor similarity over item factor rows:
//! - "Items whose factor vectors point the same way"
//! - Descending cosine similarity, self included
//!
//! ### KNN Index (Fallback)
//! Distance search over explicit interaction rows:
//! - "Items interacted with by the same feature columns"
//! - Ascending cosine or euclidean distance
//!
//! ## Example Usage
//!
//! ```ignore
//! use similarity::{AlsModel, KnnIndex, SimilarItems, NearestNeighbors};
//! use std::sync::Arc;
//!
//! let als = AlsModel::from_artifact(artifacts.factors)?;
//! let knn = KnnIndex::fit(Arc::new(artifacts.matrix), artifacts.knn);
//!
//! let primary = als.similar_items(item_index, 11)?;
//! let fallback = knn.nearest(matrix.row(item_index).unwrap(), 11)?;
//! ```
//!
//! Both models are read-only after construction and are queried through the
//! `SimilarItems` / `NearestNeighbors` traits so the serving layer never
//! depends on the concrete types.

// Public modules
pub mod als;
pub mod error;
pub mod knn;
pub mod traits;

// Re-export commonly used types
pub use als::AlsModel;
pub use error::{ModelError, Result};
pub use knn::KnnIndex;
pub use traits::{Neighbor, NearestNeighbors, SimilarItems};
