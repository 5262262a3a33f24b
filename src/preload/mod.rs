//! Bulk sprite preload.
//!
//! Warms the disk cache for the entire known entity set at startup: one
//! fetch per entity on the bounded executor, a monotonic completed-count
//! reported to the consumer, and a hard global timeout with best-effort
//! cooperative cancellation.

mod coordinator;
mod types;

pub use coordinator::PreloadCoordinator;
pub use types::{
    PreloadError, PreloadOutcome, PreloadProgress, PreloadState, DEFAULT_PRELOAD_TIMEOUT,
};
