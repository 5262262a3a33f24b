//! The bulk preload coordinator.

use super::types::{PreloadError, PreloadOutcome, PreloadProgress, PreloadState};
use crate::entity::EntityId;
use crate::executor::FetchExecutor;
use crate::source::SpriteFetch;
use crate::store::SpriteStore;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Coordinates a bulk preload of the entire entity set.
///
/// Submits one fetch task per entity to the shared executor and aggregates a
/// monotonic completed-count. Progress snapshots are pushed over an
/// unbounded channel, so reporting never blocks a worker; the consumer owns
/// marshaling them onto its UI loop.
///
/// Per-item failures are logged and still count toward completion; a single
/// bad entity never aborts the bulk operation. The only hard failure is an
/// empty entity set.
pub struct PreloadCoordinator<C: SpriteFetch> {
    store: Arc<SpriteStore<C>>,
    executor: Arc<FetchExecutor>,
    state: Mutex<PreloadState>,
}

impl<C: SpriteFetch + 'static> PreloadCoordinator<C> {
    /// Creates a coordinator over the shared store and executor.
    pub fn new(store: Arc<SpriteStore<C>>, executor: Arc<FetchExecutor>) -> Self {
        Self {
            store,
            executor,
            state: Mutex::new(PreloadState::Idle),
        }
    }

    /// Returns the current state machine position.
    pub fn state(&self) -> PreloadState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: PreloadState) {
        *self.state.lock().unwrap() = state;
    }

    /// Runs a preload over `ids` with a global timeout.
    ///
    /// Each entity's fetch outcome (cached bytes, negative result, or
    /// per-item failure) advances the completed-count exactly once and emits
    /// a `(completed, total)` snapshot on `progress`. A closed receiver is
    /// ignored; delivery is best-effort.
    ///
    /// # Returns
    ///
    /// * `Ok(PreloadOutcome::Completed)` - all attempts finished in time
    /// * `Ok(PreloadOutcome::TimedOut { .. })` - the deadline elapsed;
    ///   remaining tasks were cancelled cooperatively and their eventual
    ///   completions are discarded
    /// * `Err(PreloadError::EmptyEntitySet)` - precondition violation
    pub async fn run(
        &self,
        ids: Vec<EntityId>,
        progress: UnboundedSender<PreloadProgress>,
        timeout: Duration,
    ) -> Result<PreloadOutcome, PreloadError> {
        if ids.is_empty() {
            self.set_state(PreloadState::Failed);
            return Err(PreloadError::EmptyEntitySet);
        }

        self.set_state(PreloadState::Running);
        let total = ids.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        info!(total = total, "bulk preload starting");

        let mut handles = Vec::with_capacity(total);
        for id in ids {
            let store = Arc::clone(&self.store);
            let completed = Arc::clone(&completed);
            let progress = progress.clone();
            let cancel = cancel.child_token();

            let handle = self.executor.submit(async move {
                // Cancelled between queueing and execution: the run is over,
                // this attempt no longer counts.
                if cancel.is_cancelled() {
                    return;
                }

                if let Err(e) = store.get(&id).await {
                    // Degrades to "no sprite for this id"; never aborts the
                    // bulk run and is retried on the next access.
                    warn!(id = %id, error = %e, "preload fetch failed");
                }

                // The run timed out while this fetch was in flight; its
                // completion is discarded, not reported.
                if cancel.is_cancelled() {
                    return;
                }

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                let _ = progress.send(PreloadProgress {
                    completed: done,
                    total,
                });
            });

            match handle {
                Ok(h) => handles.push(h),
                Err(e) => {
                    self.set_state(PreloadState::Failed);
                    return Err(e.into());
                }
            }
        }

        match tokio::time::timeout(timeout, join_all(handles)).await {
            Ok(_) => {
                info!(total = total, "bulk preload completed");
                self.set_state(PreloadState::Completed);
                Ok(PreloadOutcome::Completed)
            }
            Err(_) => {
                let done = completed.load(Ordering::SeqCst);
                warn!(
                    completed = done,
                    total = total,
                    timeout_secs = timeout.as_secs(),
                    "bulk preload timed out, cancelling remaining fetches"
                );
                cancel.cancel();
                self.set_state(PreloadState::TimedOut);
                Ok(PreloadOutcome::TimedOut { completed: done })
            }
        }
    }
}
