//! # Recommendation Resolver
//!
//! The decision core of the service. One request runs this state machine:
//!
//! 1. Readiness check: no registry installed, or a degenerate one, ends the
//!    request with an empty result
//! 2. Membership check: unknown catalog ids end with an empty result
//! 3. Index translation: catalog id to model-internal row index
//! 4. Primary attempt: ALS neighbors, post-processed
//! 5. Fallback attempt: KNN neighbors, entered only when the primary query
//!    returned an error
//! 6. The final ordered list, possibly shorter than requested
//!
//! Two rules are load-bearing and deliberately asymmetric:
//! - A primary query that FAILS (returns `Err`) triggers the fallback.
//! - A primary query that SUCCEEDS with few results, or none at all after
//!   filtering, is returned as-is. Short success is a valid answer, not a
//!   failure, and masking it with fallback output would hide model drift.
//!
//! Both branches share one post-processing routine (self-exclusion,
//! unmapped-index filtering, translation, dedup, truncation) so their
//! output shape never diverges.
//!
//! No error escapes `resolve`: every failure degrades to an empty or
//! partial result, and the transport layer decides what an empty result
//! means on the wire.

use std::collections::HashSet;

use tracing::{debug, warn};

use model_store::{AudioId, InverseItemMap, ItemIndex};
use similarity::{ModelError, Neighbor};

use crate::registry::{ModelRegistry, RegistrySlot};

/// Resolves similar-item requests against the installed model registry.
///
/// Cheap to clone; clones observe the same registry slot.
#[derive(Clone)]
pub struct SimilarityResolver {
    registry: RegistrySlot,
}

impl SimilarityResolver {
    pub fn new(registry: RegistrySlot) -> Self {
        Self { registry }
    }

    /// Return up to `top_n` catalog ids similar to `audio_id`, best match
    /// first.
    ///
    /// The result is bounded, deduplicated, and never contains `audio_id`
    /// itself. An empty result is a valid outcome meaning "not ready",
    /// "unknown id", or "no resolvable neighbors"; this method never
    /// returns an error.
    pub fn resolve(&self, audio_id: AudioId, top_n: usize) -> Vec<AudioId> {
        let Some(registry) = self.registry.get().filter(|r| r.is_ready()) else {
            warn!(audio_id, "Recommendation requested before models were loaded");
            return Vec::new();
        };

        let Some(item_index) = registry.item_map().index_of(audio_id) else {
            warn!(audio_id, "Audio id not found in training data");
            return Vec::new();
        };

        match self.primary_attempt(&registry, item_index, top_n) {
            Ok(recs) => recs,
            Err(reason) => {
                warn!(audio_id, %reason, "ALS query failed, falling back to KNN");
                match self.fallback_attempt(&registry, item_index, top_n) {
                    Ok(recs) => recs,
                    Err(reason) => {
                        warn!(audio_id, %reason, "KNN query also failed");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Query the primary model for `top_n + 1` neighbors (the item itself
    /// usually leads its own list) and post-process them. Descending
    /// similarity order is preserved.
    fn primary_attempt(
        &self,
        registry: &ModelRegistry,
        item_index: ItemIndex,
        top_n: usize,
    ) -> Result<Vec<AudioId>, ModelError> {
        let neighbors = registry
            .primary()
            .similar_items(item_index, top_n.saturating_add(1))?;
        Ok(translate_neighbors(
            neighbors,
            item_index,
            registry.inv_item_map(),
            top_n,
        ))
    }

    /// Fetch the item's interaction row and query the fallback index the
    /// same way. Ascending distance order is preserved. A missing matrix
    /// row counts as a fallback failure.
    fn fallback_attempt(
        &self,
        registry: &ModelRegistry,
        item_index: ItemIndex,
        top_n: usize,
    ) -> Result<Vec<AudioId>, ModelError> {
        let row = registry
            .matrix()
            .row(item_index)
            .ok_or(ModelError::IndexOutOfBounds {
                index: item_index,
                len: registry.matrix().n_rows(),
            })?;
        let neighbors = registry
            .fallback()
            .nearest(row, top_n.saturating_add(1))?;
        Ok(translate_neighbors(
            neighbors,
            item_index,
            registry.inv_item_map(),
            top_n,
        ))
    }
}

/// Shared post-processing for both model branches.
///
/// In emission order: drop the item itself, drop neighbor indices the
/// inverse map does not know (stale model rows after partial map drift),
/// translate to catalog ids, drop duplicates, stop at `top_n`.
fn translate_neighbors(
    neighbors: Vec<Neighbor>,
    own_index: ItemIndex,
    inv_map: &InverseItemMap,
    top_n: usize,
) -> Vec<AudioId> {
    let mut seen: HashSet<AudioId> = HashSet::with_capacity(neighbors.len());
    let mut recs = Vec::with_capacity(top_n.min(neighbors.len()));

    for neighbor in neighbors {
        if neighbor.index == own_index {
            continue;
        }
        let Some(id) = inv_map.id_of(neighbor.index) else {
            debug!(index = neighbor.index, "Dropping neighbor missing from inverse map");
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        recs.push(id);
        if recs.len() == top_n {
            break;
        }
    }
    recs
}
