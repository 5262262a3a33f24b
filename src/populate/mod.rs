//! Progressive delivery of large ordered result sets.
//!
//! A filtered catalog list can run to hundreds of entries. Materializing all
//! of them before showing anything makes the first paint crawl, so the
//! populator materializes a bounded head batch up front and streams the
//! ordered tail one item at a time, yielding between items so other
//! background work is never starved.

mod populator;

pub use populator::{ListPopulator, ProgressiveRun, RunHandle, DEFAULT_BATCH_SIZE};
