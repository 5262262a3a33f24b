//! The disk-backed sprite store.

use super::path::{artifact_path, marker_path, MARKER_EXTENSION};
use super::types::StoreError;
use crate::entity::EntityId;
use crate::source::{SourceResolver, SpriteFetch};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Monotonic suffix for temporary write paths, so concurrent writers for the
/// same id never touch the same temp file.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Read-through, write-through disk cache of sprite images.
///
/// Maps entity ids to raw image bytes on disk. An id is in one of three
/// states: absent (never attempted), cached (artifact file present and
/// decodable), or negative-cached (marker file present; every source was
/// exhausted and no further network attempts are made).
///
/// # Concurrency
///
/// Safe under concurrent calls for distinct ids. Concurrent calls for the
/// same id may duplicate the underlying fetch on a cache-miss race, but can
/// never corrupt the artifact: every write goes to a unique temp file and is
/// renamed into place, so a reader only ever observes a complete file.
pub struct SpriteStore<C: SpriteFetch> {
    cache_dir: PathBuf,
    resolver: SourceResolver<C>,
}

impl<C: SpriteFetch> SpriteStore<C> {
    /// Opens a store over the given cache directory, creating it if needed.
    ///
    /// Directory initialization is idempotent; an existing directory (with
    /// or without cached artifacts) is reused as-is.
    pub fn new(cache_dir: impl Into<PathBuf>, resolver: SourceResolver<C>) -> Result<Self, StoreError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir, resolver })
    }

    /// Returns the cache directory root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Gets the sprite bytes for an id, fetching and persisting on a miss.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - decodable image bytes, from disk or freshly
    ///   fetched and persisted
    /// * `Ok(None)` - every source exhausted; a negative marker now exists
    ///   and suppresses future network attempts for this id
    /// * `Err(_)` - transient I/O failure; nothing was persisted, the id
    ///   remains eligible for retry on the next access
    pub async fn get(&self, id: &EntityId) -> Result<Option<Vec<u8>>, StoreError> {
        // Negative marker short-circuits before any artifact or network I/O.
        if tokio::fs::try_exists(marker_path(&self.cache_dir, id)).await? {
            return Ok(None);
        }

        let artifact = artifact_path(&self.cache_dir, id);
        match tokio::fs::read(&artifact).await {
            Ok(bytes) => {
                if crate::source::validate_image(&bytes).is_ok() {
                    return Ok(Some(bytes));
                }
                // Corrupt artifact (partial write from a crashed run, or a
                // bad payload that slipped through). Self-heal: delete and
                // re-fetch, at most once.
                warn!(id = %id, path = %artifact.display(), "cached sprite failed to decode, re-fetching");
                tokio::fs::remove_file(&artifact).await?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.fetch_and_persist(id).await
    }

    /// Resolves an id from the sources and persists the outcome.
    async fn fetch_and_persist(&self, id: &EntityId) -> Result<Option<Vec<u8>>, StoreError> {
        match self.resolver.resolve(id).await {
            Some(bytes) => {
                self.write_atomic(&artifact_path(&self.cache_dir, id), &bytes)
                    .await?;
                debug!(id = %id, bytes = bytes.len(), "sprite cached");
                Ok(Some(bytes))
            }
            None => {
                // Persist the negative result so repeated lookups never hit
                // the network again for this id.
                tokio::fs::write(marker_path(&self.cache_dir, id), []).await?;
                debug!(id = %id, "negative marker written");
                Ok(None)
            }
        }
    }

    /// Writes bytes to a unique temp file, then renames into place.
    ///
    /// The rename makes the artifact atomically visible: no reader ever
    /// observes a partially written file.
    async fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = dest.with_extension(format!("tmp{}", seq));

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Returns `true` if an id has a negative marker.
    pub async fn is_negative(&self, id: &EntityId) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(marker_path(&self.cache_dir, id)).await?)
    }

    /// Returns `true` if an id has a cached artifact file.
    pub async fn contains(&self, id: &EntityId) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(artifact_path(&self.cache_dir, id)).await?)
    }

    /// Removes the artifact and negative marker for one id.
    ///
    /// The next access for this id will go back to the sources. Missing
    /// files are not an error.
    pub async fn invalidate(&self, id: &EntityId) -> Result<(), StoreError> {
        for path in [
            artifact_path(&self.cache_dir, id),
            marker_path(&self.cache_dir, id),
        ] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Removes every negative marker, allowing all exhausted ids to retry.
    ///
    /// Useful when the upstream catalog may have gained new artwork since
    /// the markers were written. Returns the number of markers removed.
    pub async fn clear_negative_markers(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(MARKER_EXTENSION)
                && tokio::fs::remove_file(&path).await.is_ok()
            {
                removed += 1;
            }
        }

        debug!(removed = removed, "negative markers cleared");
        Ok(removed)
    }
}
