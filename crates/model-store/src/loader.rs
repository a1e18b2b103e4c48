//! Startup artifact loading.
//!
//! Loads the five serving artifacts (ALS factors, KNN parameters, both
//! identifier maps, and the interaction matrix), then cross-validates them
//! before handing anything to the registry. The whole load fails on the
//! first inconsistency: the service must never come up with partial state.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::discover::latest_artifact;
use crate::error::{Result, StoreError};
use crate::types::{CsrMatrix, FactorsArtifact, InverseItemMap, ItemMap, KnnParams};

/// Artifact extension produced by the export job
const ARTIFACT_EXT: &str = "json";

/// Directories the export job writes artifacts into.
///
/// The defaults match the layout of the training pipeline; binaries may
/// override them from the environment.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub models_dir: PathBuf,
    pub map_dir: PathBuf,
    pub matrix_dir: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("./models"),
            map_dir: PathBuf::from("./map_data"),
            matrix_dir: PathBuf::from("./matrix_data"),
        }
    }
}

impl ArtifactPaths {
    /// Standard layout under a single root directory
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            models_dir: root.join("models"),
            map_dir: root.join("map_data"),
            matrix_dir: root.join("matrix_data"),
        }
    }
}

/// The complete, validated artifact set for one serving generation
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub factors: FactorsArtifact,
    pub knn: KnnParams,
    pub item_map: ItemMap,
    pub inv_item_map: InverseItemMap,
    pub matrix: CsrMatrix,
}

impl LoadedArtifacts {
    /// Discover, parse, and validate the newest artifact set.
    ///
    /// Steps:
    /// 1. Resolve the newest file for each of the five artifacts
    /// 2. Parse all five in parallel
    /// 3. Cross-validate shapes and the map inverse invariant
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let als_path = latest_artifact(&paths.models_dir, "als", ARTIFACT_EXT)?;
        let knn_path = latest_artifact(&paths.models_dir, "knn", ARTIFACT_EXT)?;
        let item_map_path = latest_artifact(&paths.map_dir, "item_map", ARTIFACT_EXT)?;
        let inv_map_path = latest_artifact(&paths.map_dir, "inv_item_map", ARTIFACT_EXT)?;
        let matrix_path = latest_artifact(&paths.matrix_dir, "matrix", ARTIFACT_EXT)?;

        // Parse in parallel; the factor matrix and the interaction matrix
        // dominate load time, so they each get their own branch.
        let ((factors, knn), (maps, matrix)) = rayon::join(
            || {
                rayon::join(
                    || read_json::<FactorsArtifact>(&als_path),
                    || read_json::<KnnParams>(&knn_path),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || read_json::<ItemMap>(&item_map_path),
                            || read_json::<InverseItemMap>(&inv_map_path),
                        )
                    },
                    || read_json::<CsrMatrix>(&matrix_path),
                )
            },
        );

        let factors = factors?;
        let knn = knn?;
        let (item_map, inv_item_map) = {
            let (item_map, inv_item_map) = maps;
            (item_map?, inv_item_map?)
        };
        let matrix = matrix?;

        info!(
            items = item_map.len(),
            factors = factors.factors,
            matrix_nnz = matrix.nnz(),
            "Parsed artifact set"
        );

        let loaded = Self {
            factors,
            knn,
            item_map,
            inv_item_map,
            matrix,
        };
        loaded.validate()?;

        info!(
            als = %als_path.display(),
            knn = %knn_path.display(),
            item_map = %item_map_path.display(),
            inv_item_map = %inv_map_path.display(),
            matrix = %matrix_path.display(),
            "Artifact set validated"
        );
        Ok(loaded)
    }

    /// Cross-artifact validation.
    ///
    /// Checks that:
    /// - each artifact is internally consistent
    /// - the identifier maps are exact inverses and cover `items` entries
    /// - every mapped index is a valid row of both the factor matrix and
    ///   the interaction matrix
    /// - the interaction matrix has one row per trained item
    pub fn validate(&self) -> Result<()> {
        self.factors.validate()?;
        self.matrix.validate()?;
        self.item_map.verify_inverse(&self.inv_item_map)?;

        if self.item_map.len() != self.factors.items {
            return Err(StoreError::ShapeMismatch {
                entity: "item map".to_string(),
                expected: self.factors.items,
                found: self.item_map.len(),
            });
        }
        if self.matrix.n_rows() != self.factors.items {
            return Err(StoreError::ShapeMismatch {
                entity: "interaction matrix rows".to_string(),
                expected: self.factors.items,
                found: self.matrix.n_rows(),
            });
        }
        for (id, index) in self.item_map.iter() {
            if index >= self.factors.items {
                return Err(StoreError::Validation(format!(
                    "item {id} maps to index {index}, outside {} model rows",
                    self.factors.items
                )));
            }
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
