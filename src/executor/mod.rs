//! Bounded executor for fetch and scale work.
//!
//! All sprite store and source resolver calls triggered by UI or preload
//! activity run here, never on the caller's thread. The pool is sized for
//! I/O-bound image work (network + disk + decode).

mod pool;

pub use pool::{
    default_fetch_parallelism, ExecutorError, FetchExecutor, ShutdownOutcome,
    FALLBACK_CPU_COUNT, FETCH_WORKER_CPU_MULTIPLIER, MIN_FETCH_WORKERS,
};
