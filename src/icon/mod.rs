//! In-memory cache of pre-scaled sprite icons.
//!
//! Decoding and scaling a sprite is cheap next to the network fetch it
//! wraps, but repeated per-frame UI requests add up. This cache memoizes the
//! decoded, pre-scaled result per (id, target size) so each combination is
//! computed at most once per process under normal operation.

mod cache;
mod scale;

pub use cache::ScaledIconCache;
pub use scale::{scale_sprite, ScaledSprite};
