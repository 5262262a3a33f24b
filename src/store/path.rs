//! Cache path derivation for sprite artifacts and negative markers.

use crate::entity::EntityId;
use std::path::{Path, PathBuf};

/// File extension for cached sprite artifacts.
pub const SPRITE_EXTENSION: &str = "png";

/// File extension for negative markers.
///
/// A marker records that every source was exhausted for an id, so no further
/// network attempts are made. The marker set and the artifact set are
/// disjoint per id.
pub const MARKER_EXTENSION: &str = "missing";

/// Returns the artifact file path for an id.
pub fn artifact_path(cache_dir: &Path, id: &EntityId) -> PathBuf {
    cache_dir.join(format!("{}.{}", id, SPRITE_EXTENSION))
}

/// Returns the negative marker path for an id.
pub fn marker_path(cache_dir: &Path, id: &EntityId) -> PathBuf {
    cache_dir.join(format!("{}.{}", id, MARKER_EXTENSION))
}
