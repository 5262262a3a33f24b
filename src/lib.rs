//! Spritedex - sprite cache and asynchronous image-delivery pipeline
//!
//! This library provides the caching core for a catalog browser that displays
//! per-entry sprite images fetched from remote sources: a disk-backed sprite
//! store with negative-result caching, an in-memory cache of pre-scaled
//! icons, a bounded fetch executor, a bulk preload coordinator, and a
//! progressive list populator for large result sets.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use spritedex::service::{ServiceConfig, SpriteService};
//!
//! let config = ServiceConfig::default();
//! let service = SpriteService::new(config)?;
//!
//! // Warm the cache for the whole catalog at startup
//! let (tx, mut progress) = tokio::sync::mpsc::unbounded_channel();
//! let outcome = service.preload_all(ids, tx).await?;
//! ```

pub mod entity;
pub mod executor;
pub mod icon;
pub mod logging;
pub mod populate;
pub mod preload;
pub mod service;
pub mod source;
pub mod store;

/// Version of the spritedex library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
