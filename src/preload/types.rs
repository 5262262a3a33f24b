//! Preload types.

use crate::executor::ExecutorError;
use std::time::Duration;
use thiserror::Error;

/// Default global preload timeout.
pub const DEFAULT_PRELOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A progress snapshot: `(completed, total)`.
///
/// `completed` is monotonically non-decreasing and advances exactly once per
/// finished fetch attempt, whether that attempt cached bytes, recorded a
/// negative result, or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadProgress {
    /// Number of entities whose fetch attempt has finished
    pub completed: usize,
    /// Total number of entities in this preload run
    pub total: usize,
}

/// Terminal outcome of a preload run.
///
/// A timeout is an expected, explicit outcome rather than an error: the
/// caller decides whether to proceed with partial sprite availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// Every fetch attempt finished before the timeout
    Completed,
    /// The global timeout elapsed first; remaining work was cancelled
    /// best-effort
    TimedOut {
        /// Attempts that finished before the deadline
        completed: usize,
    },
}

/// Coordinator state machine: `Idle → Running → {Completed, TimedOut, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadState {
    /// No run has started
    Idle,
    /// A run is in flight
    Running,
    /// The last run finished all attempts in time
    Completed,
    /// The last run hit the global timeout
    TimedOut,
    /// The last run was rejected up front (precondition violation)
    Failed,
}

/// Preload errors.
///
/// Individual entity failures never surface here; they are logged, counted
/// as completed, and degrade to "no sprite for that id".
#[derive(Debug, Error)]
pub enum PreloadError {
    /// The entity set was empty; there is nothing to preload
    #[error("preload requires a non-empty entity set")]
    EmptyEntitySet,

    /// The executor rejected work (shutdown in progress)
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
