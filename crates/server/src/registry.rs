//! # Model Registry
//!
//! Holds the five read-only entities the resolver consumes: the primary
//! model, the fallback model, the interaction matrix, and the two
//! identifier maps. The registry answers exactly one question for the
//! serving layer: "is the system ready to serve?"
//!
//! Two layers make up readiness:
//! - `RegistrySlot` is a set-once cell shared between the startup loader
//!   and the request path. An empty slot means the load has not finished
//!   (or failed, in which case it stays empty forever and the service
//!   fails closed).
//! - `ModelRegistry::is_ready` rejects degenerate registries whose maps or
//!   matrix are empty.
//!
//! The slot is the only synchronization point in the system: one writer at
//! startup, any number of readers afterwards, no locking on the request
//! path.

use std::sync::{Arc, OnceLock};

use tracing::info;

use model_store::{CsrMatrix, InverseItemMap, ItemMap, LoadedArtifacts};
use similarity::{AlsModel, KnnIndex, ModelError, NearestNeighbors, SimilarItems};

/// The five read-only entities behind every resolution request.
///
/// A registry value is always fully populated; partial state is not
/// constructible. The models are held behind their query traits so tests
/// can inject fakes.
pub struct ModelRegistry {
    primary: Arc<dyn SimilarItems>,
    fallback: Arc<dyn NearestNeighbors>,
    matrix: Arc<CsrMatrix>,
    item_map: ItemMap,
    inv_item_map: InverseItemMap,
}

impl ModelRegistry {
    /// Assemble a registry from its five entities
    pub fn new(
        primary: Arc<dyn SimilarItems>,
        fallback: Arc<dyn NearestNeighbors>,
        matrix: Arc<CsrMatrix>,
        item_map: ItemMap,
        inv_item_map: InverseItemMap,
    ) -> Self {
        Self {
            primary,
            fallback,
            matrix,
            item_map,
            inv_item_map,
        }
    }

    /// Build the real models from a validated artifact set.
    ///
    /// The fallback index is fitted against the same matrix instance the
    /// resolver reads feature rows from.
    pub fn from_artifacts(artifacts: LoadedArtifacts) -> Result<Self, ModelError> {
        let matrix = Arc::new(artifacts.matrix);
        let als = AlsModel::from_artifact(artifacts.factors)?;
        let knn = KnnIndex::fit(matrix.clone(), artifacts.knn);

        info!(
            items = artifacts.item_map.len(),
            factors = als.factors(),
            metric = ?knn.metric(),
            "Model registry assembled"
        );
        Ok(Self::new(
            Arc::new(als),
            Arc::new(knn),
            matrix,
            artifacts.item_map,
            artifacts.inv_item_map,
        ))
    }

    /// True iff all five entities are present and non-empty.
    ///
    /// The models themselves cannot be empty when the maps are non-empty:
    /// artifact validation pins map size to model rows. No side effects.
    pub fn is_ready(&self) -> bool {
        !self.item_map.is_empty() && !self.inv_item_map.is_empty() && self.matrix.n_rows() > 0
    }

    pub fn primary(&self) -> &dyn SimilarItems {
        self.primary.as_ref()
    }

    pub fn fallback(&self) -> &dyn NearestNeighbors {
        self.fallback.as_ref()
    }

    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub fn item_map(&self) -> &ItemMap {
        &self.item_map
    }

    pub fn inv_item_map(&self) -> &InverseItemMap {
        &self.inv_item_map
    }
}

/// Set-once handle to the registry, shared by the loader and the request
/// path.
///
/// Cloning the slot clones the handle, not the registry; all clones observe
/// the same install.
#[derive(Clone, Default)]
pub struct RegistrySlot {
    inner: Arc<OnceLock<Arc<ModelRegistry>>>,
}

impl RegistrySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the loaded registry. Returns false if one was already
    /// installed; the existing registry stays in place.
    pub fn install(&self, registry: ModelRegistry) -> bool {
        self.inner.set(Arc::new(registry)).is_ok()
    }

    /// The installed registry, if the startup load has completed
    pub fn get(&self) -> Option<Arc<ModelRegistry>> {
        self.inner.get().cloned()
    }

    /// True iff a registry is installed and ready to serve
    pub fn is_ready(&self) -> bool {
        self.get().map(|r| r.is_ready()).unwrap_or(false)
    }
}
