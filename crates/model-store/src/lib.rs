//! # Model Store Crate
//!
//! This crate owns the serving artifacts for the recommendation service:
//! how they look on disk, how the newest set is discovered, and how a set
//! is loaded and validated at startup.
//!
//! ## Main Components
//!
//! - **types**: artifact types (ItemMap, InverseItemMap, CsrMatrix, factors)
//! - **discover**: newest-file artifact discovery
//! - **loader**: parallel load plus fail-closed cross-validation
//! - **error**: error types for discovery and loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use model_store::{ArtifactPaths, LoadedArtifacts};
//!
//! let paths = ArtifactPaths::default();
//! let artifacts = LoadedArtifacts::load(&paths)?;
//!
//! println!("Serving {} items", artifacts.item_map.len());
//! ```
//!
//! A load either yields a complete, mutually consistent artifact set or an
//! error; there is no partially loaded state for the serving layer to
//! observe.

// Public modules
pub mod discover;
pub mod error;
pub mod loader;
pub mod types;

// Re-export commonly used types for convenience
pub use discover::latest_artifact;
pub use error::{Result, StoreError};
pub use loader::{ArtifactPaths, LoadedArtifacts};
pub use types::{
    // Type aliases
    AudioId,
    ItemIndex,
    // Artifact types
    CsrMatrix,
    FactorsArtifact,
    InverseItemMap,
    ItemMap,
    KnnParams,
    Metric,
    SparseRow,
};
