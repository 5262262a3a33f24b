//! The bounded fetch pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Multiplier for CPU count to compute the fetch pool size.
///
/// Fetch work is I/O-bound (network + disk + decode), so the pool is wider
/// than the core count to keep connections busy while decodes run.
pub const FETCH_WORKER_CPU_MULTIPLIER: usize = 2;

/// Minimum pool size regardless of CPU count.
pub const MIN_FETCH_WORKERS: usize = 4;

/// Fallback CPU count when detection fails.
pub const FALLBACK_CPU_COUNT: usize = 4;

/// Computes the default fetch pool size.
///
/// Formula: `max(MIN_FETCH_WORKERS, num_cpus * FETCH_WORKER_CPU_MULTIPLIER)`
pub fn default_fetch_parallelism() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(FALLBACK_CPU_COUNT);
    (cpus * FETCH_WORKER_CPU_MULTIPLIER).max(MIN_FETCH_WORKERS)
}

/// Executor errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor has been shut down and accepts no new work
    #[error("executor is shutting down, task rejected")]
    ShuttingDown,
}

/// How a shutdown concluded.
///
/// A forced shutdown is a degraded-but-recoverable condition, not a fatal
/// error: in-flight work is abandoned cooperatively, never forcibly killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All outstanding work finished within the grace period
    Clean,
    /// The grace period elapsed; remaining work was cancelled best-effort
    ForcedAfterTimeout,
}

/// Bounded concurrent executor for fetch and scale tasks.
///
/// Tasks are spawned onto the tokio runtime but gated by a semaphore, so at
/// most the configured number run simultaneously; the rest queue. Submission
/// returns a [`JoinHandle`] future the caller can await.
///
/// Shutdown is graceful: new work is rejected, outstanding work gets a
/// bounded grace interval, then the cancellation token fires and stragglers
/// are expected to bail out at their next checkpoint.
pub struct FetchExecutor {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    max_parallelism: usize,
}

impl FetchExecutor {
    /// Creates an executor sized by [`default_fetch_parallelism`].
    pub fn new() -> Self {
        Self::with_parallelism(default_fetch_parallelism())
    }

    /// Creates an executor with an explicit parallelism bound.
    pub fn with_parallelism(max_parallelism: usize) -> Self {
        debug!(workers = max_parallelism, "fetch executor created");
        Self {
            semaphore: Arc::new(Semaphore::new(max_parallelism)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            max_parallelism,
        }
    }

    /// Returns the configured parallelism bound.
    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Returns a child token that fires when the executor force-cancels.
    ///
    /// Long-running tasks should check it between steps; in-flight network
    /// calls are abandoned at the next checkpoint, not interrupted.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Submits a task, returning a handle to await its result.
    ///
    /// The task waits for a pool slot before running, so no more than the
    /// configured number of tasks execute at once.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ShuttingDown`] once shutdown has begun.
    pub fn submit<F>(&self, task: F) -> Result<JoinHandle<F::Output>, ExecutorError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.tracker.is_closed() {
            return Err(ExecutorError::ShuttingDown);
        }

        let semaphore = Arc::clone(&self.semaphore);
        Ok(self.tracker.spawn(async move {
            // The semaphore is never closed, so this only yields while the
            // pool is saturated.
            let _permit = semaphore.acquire_owned().await.ok();
            task.await
        }))
    }

    /// Shuts the executor down gracefully.
    ///
    /// Stops accepting new work, waits up to `grace` for outstanding tasks,
    /// then fires the cancellation token and reports
    /// [`ShutdownOutcome::ForcedAfterTimeout`].
    pub async fn shutdown(&self, grace: Duration) -> ShutdownOutcome {
        self.tracker.close();

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                debug!("fetch executor shut down cleanly");
                ShutdownOutcome::Clean
            }
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    outstanding = self.tracker.len(),
                    "fetch executor grace period elapsed, cancelling remaining work"
                );
                self.cancel.cancel();
                ShutdownOutcome::ForcedAfterTimeout
            }
        }
    }

    /// Returns the number of tasks currently tracked (queued or running).
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }
}

impl Default for FetchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_parallelism_formula() {
        let workers = default_fetch_parallelism();
        assert!(workers >= MIN_FETCH_WORKERS);

        let cpus = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(FALLBACK_CPU_COUNT);
        assert_eq!(workers, (cpus * FETCH_WORKER_CPU_MULTIPLIER).max(MIN_FETCH_WORKERS));
    }

    #[tokio::test]
    async fn test_submit_runs_task() {
        let executor = FetchExecutor::with_parallelism(2);
        let handle = executor.submit(async { 2 + 2 }).unwrap();
        assert_eq!(handle.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let executor = FetchExecutor::with_parallelism(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..24 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let handle = executor
                .submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap();
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(
            peak.load(Ordering::SeqCst) <= 3,
            "no more than the pool size may run at once"
        );
    }

    #[tokio::test]
    async fn test_clean_shutdown() {
        let executor = FetchExecutor::with_parallelism(2);
        executor
            .submit(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
            })
            .unwrap();

        let outcome = executor.shutdown(Duration::from_secs(1)).await;
        assert_eq!(outcome, ShutdownOutcome::Clean);
    }

    #[tokio::test]
    async fn test_forced_shutdown_cancels_cooperatively() {
        let executor = FetchExecutor::with_parallelism(2);
        let token = executor.cancellation_token();
        let observed = Arc::new(AtomicUsize::new(0));

        let observed_clone = Arc::clone(&observed);
        executor
            .submit(async move {
                // Stuck until cancelled
                token.cancelled().await;
                observed_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let outcome = executor.shutdown(Duration::from_millis(20)).await;
        assert_eq!(outcome, ShutdownOutcome::ForcedAfterTimeout);

        // The stuck task should now observe the token and finish
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let executor = FetchExecutor::with_parallelism(2);
        executor.shutdown(Duration::from_millis(10)).await;

        let result = executor.submit(async {});
        assert!(matches!(result, Err(ExecutorError::ShuttingDown)));
    }
}
