//! The scaled-icon memoization cache.

use super::scale::ScaledSprite;
use crate::entity::EntityId;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

/// Cache key: entity id plus target size in pixels.
pub(crate) type IconKey = (EntityId, u32);

/// Purely additive memoization of pre-scaled sprites.
///
/// Entries are immutable once inserted and never updated in place; the cache
/// may be cleared wholesale to reclaim memory. The supplier may run more
/// than once for the same key under a miss race (the computation is cheap
/// and idempotent), but every caller receives a handle to the single entry
/// that won the insert.
pub struct ScaledIconCache {
    map: DashMap<IconKey, Arc<ScaledSprite>>,
}

impl ScaledIconCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Returns the cached entry, or computes, stores, and returns it.
    ///
    /// The supplier is only invoked on a miss. A supplier returning
    /// `Ok(None)` (no sprite available for this id) is passed through
    /// uncached, so a later marker invalidation can still take effect.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        id: &EntityId,
        size: u32,
        supplier: F,
    ) -> Result<Option<Arc<ScaledSprite>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ScaledSprite>, E>>,
    {
        let key = (id.clone(), size);
        if let Some(entry) = self.map.get(&key) {
            return Ok(Some(Arc::clone(entry.value())));
        }

        match supplier().await? {
            Some(sprite) => {
                // First insert wins; a racing computation gets the winner's
                // handle instead of replacing it.
                let entry = self
                    .map
                    .entry(key)
                    .or_insert_with(|| Arc::new(sprite));
                Ok(Some(Arc::clone(entry.value())))
            }
            None => Ok(None),
        }
    }

    /// Returns the cached entry without computing, if present.
    pub fn get(&self, id: &EntityId, size: u32) -> Option<Arc<ScaledSprite>> {
        self.map
            .get(&(id.clone(), size))
            .map(|e| Arc::clone(e.value()))
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops every entry, reclaiming memory.
    pub fn clear(&self) {
        self.map.clear();
    }
}

impl Default for ScaledIconCache {
    fn default() -> Self {
        Self::new()
    }
}
