//! Disk-backed sprite store with negative-result caching.
//!
//! One artifact file per cached id, one marker file per id whose sources are
//! all exhausted. The store is read-through and write-through: a miss
//! triggers the source resolver and the result (bytes or negative marker) is
//! persisted before being returned.

mod path;
mod sprite;
mod types;

pub use path::{artifact_path, marker_path, MARKER_EXTENSION, SPRITE_EXTENSION};
pub use sprite::SpriteStore;
pub use types::StoreError;
