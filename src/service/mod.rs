//! High-level facade over the sprite pipeline.
//!
//! The presentation layer constructs one [`SpriteService`] at process start
//! and passes it by handle into every call site that needs images. All
//! shared state (disk store, icon cache, executor) is owned here and
//! injected explicitly; there are no process-wide globals, so tests can
//! stand up a service over a temp directory and a fake fetcher.

mod config;
mod sprites;

pub use config::ServiceConfig;
pub use sprites::{ServiceError, SpriteService};
