//! The progressive list populator.

use std::future::Future;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default number of items materialized before the call returns.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Handle to a progressive run.
///
/// Marking a run superseded stops further deliveries at the next item
/// boundary. Work already in flight is abandoned, not forcibly killed, and
/// anything it would have delivered is discarded.
#[derive(Debug, Clone)]
pub struct RunHandle {
    cancel: CancellationToken,
}

impl RunHandle {
    /// Marks the run superseded; no further items will be delivered.
    pub fn supersede(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the run has been superseded.
    pub fn is_superseded(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of a populate call.
pub struct ProgressiveRun<T> {
    /// Items materialized before the call returned, in sequence order
    pub first_batch: Vec<T>,
    /// The ordered remainder, one item per receive; closes when the tail is
    /// exhausted or the run is superseded
    pub remainder: UnboundedReceiver<T>,
    /// Handle for marking this run superseded
    pub handle: RunHandle,
}

/// Materializes an ordered sequence as a head batch plus a streamed tail.
///
/// The first `min(batch_size, n)` items are materialized before the call
/// returns, guaranteeing fast first paint. The rest are produced by a single
/// background loop that walks the sequence in order, publishing each item as
/// soon as it is ready with a cooperative yield in between. Driving
/// production and publication from one ordered loop is what preserves
/// relative order; there is no fan-out to race results back from.
///
/// The materializer returns `Option<T>`: `None` means it can no longer
/// produce items (typically the backing pool is shutting down) and ends the
/// run at that boundary.
///
/// Starting a new run supersedes the previous one, so a filter change mid
/// stream abandons the stale tail instead of interleaving with it.
pub struct ListPopulator {
    batch_size: usize,
    current: Mutex<Option<CancellationToken>>,
}

impl ListPopulator {
    /// Creates a populator with the default head batch size.
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }

    /// Creates a populator with an explicit head batch size.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            current: Mutex::new(None),
        }
    }

    /// Returns the configured head batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Populates from `items`, materializing each with `materialize`.
    ///
    /// Any previous run started by this populator is superseded first. A
    /// materializer returning `None` ends the run at that item; anything
    /// already delivered stays delivered.
    pub async fn populate<I, T, F, Fut>(&self, items: Vec<I>, materialize: F) -> ProgressiveRun<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send,
    {
        let cancel = CancellationToken::new();
        if let Some(previous) = self
            .current
            .lock()
            .unwrap()
            .replace(cancel.clone())
        {
            previous.cancel();
        }

        let total = items.len();
        let head = self.batch_size.min(total);
        let mut iter = items.into_iter();
        let (tx, remainder) = mpsc::unbounded_channel();

        let mut first_batch = Vec::with_capacity(head);
        for item in iter.by_ref().take(head) {
            match materialize(item).await {
                Some(value) => first_batch.push(value),
                None => {
                    // Materializer declined; the run is over before the tail
                    cancel.cancel();
                    return ProgressiveRun {
                        first_batch,
                        remainder,
                        handle: RunHandle { cancel },
                    };
                }
            }
        }

        let rest: Vec<I> = iter.collect();

        if !rest.is_empty() {
            debug!(head = head, tail = rest.len(), "progressive run streaming tail");
            let cancel = cancel.clone();
            tokio::spawn(async move {
                for item in rest {
                    // Superseded runs stop delivering at the next boundary
                    if cancel.is_cancelled() {
                        break;
                    }

                    let Some(value) = materialize(item).await else {
                        cancel.cancel();
                        break;
                    };
                    if tx.send(value).is_err() {
                        // Consumer dropped the receiver; nothing left to do
                        break;
                    }

                    tokio::task::yield_now().await;
                }
            });
        }

        ProgressiveRun {
            first_batch,
            remainder,
            handle: RunHandle { cancel },
        }
    }
}

impl Default for ListPopulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_head_batch_is_materialized_before_return() {
        let populator = ListPopulator::with_batch_size(50);
        let items: Vec<u32> = (0..200).collect();

        let run = populator.populate(items, |i| async move { Some(i * 2) }).await;

        assert_eq!(run.first_batch.len(), 50);
        assert_eq!(run.first_batch[0], 0);
        assert_eq!(run.first_batch[49], 98);
    }

    #[tokio::test]
    async fn test_tail_streams_in_original_order() {
        let populator = ListPopulator::with_batch_size(50);
        let items: Vec<u32> = (0..200).collect();

        let mut run = populator.populate(items, |i| async move { Some(i) }).await;

        let mut tail = Vec::new();
        while let Some(item) = run.remainder.recv().await {
            tail.push(item);
        }

        assert_eq!(tail, (50..200).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_short_sequence_is_entirely_synchronous() {
        let populator = ListPopulator::with_batch_size(50);
        let items: Vec<u32> = (0..10).collect();

        let mut run = populator.populate(items, |i| async move { Some(i) }).await;

        assert_eq!(run.first_batch.len(), 10);
        assert_eq!(run.remainder.recv().await, None, "no tail to stream");
    }

    #[tokio::test]
    async fn test_empty_sequence() {
        let populator = ListPopulator::new();
        let items: Vec<u32> = vec![];

        let mut run = populator.populate(items, |i| async move { Some(i) }).await;

        assert!(run.first_batch.is_empty());
        assert_eq!(run.remainder.recv().await, None);
    }

    #[tokio::test]
    async fn test_supersede_stops_deliveries() {
        let populator = ListPopulator::with_batch_size(1);
        let items: Vec<u32> = (0..1000).collect();

        let mut run = populator
            .populate(items, |i| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Some(i)
            })
            .await;

        // Take a few items, then abandon the run
        let mut received = 0;
        while received < 3 {
            if run.remainder.recv().await.is_some() {
                received += 1;
            }
        }
        run.handle.supersede();
        assert!(run.handle.is_superseded());

        // The channel must close well short of the full sequence
        let mut after = 0;
        while run.remainder.recv().await.is_some() {
            after += 1;
        }
        assert!(
            after < 997,
            "superseded run must stop streaming, got {} more items",
            after
        );
    }

    #[tokio::test]
    async fn test_new_run_supersedes_previous() {
        let populator = ListPopulator::with_batch_size(1);
        let first_items: Vec<u32> = (0..1000).collect();

        let first = populator
            .populate(first_items, |i| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Some(i)
            })
            .await;

        // A second call (new filter applied) abandons the first run
        let second_items: Vec<u32> = (2000..2010).collect();
        let mut second = populator
            .populate(second_items, |i| async move { Some(i) })
            .await;

        assert!(first.handle.is_superseded());

        let mut tail = Vec::new();
        while let Some(item) = second.remainder.recv().await {
            tail.push(item);
        }
        assert_eq!(tail, (2001..2010).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_declining_materializer_ends_run_in_head() {
        let populator = ListPopulator::with_batch_size(50);
        let items: Vec<u32> = (0..10).collect();

        let mut run = populator
            .populate(items, |i| async move { if i < 3 { Some(i) } else { None } })
            .await;

        assert_eq!(run.first_batch, vec![0, 1, 2], "items before the decline stay delivered");
        assert_eq!(run.remainder.recv().await, None, "no tail after the run ends");
        assert!(run.handle.is_superseded());
    }

    #[tokio::test]
    async fn test_declining_materializer_ends_run_in_tail() {
        let populator = ListPopulator::with_batch_size(2);
        let items: Vec<u32> = (0..10).collect();

        let mut run = populator
            .populate(items, |i| async move { if i < 5 { Some(i) } else { None } })
            .await;

        assert_eq!(run.first_batch, vec![0, 1]);

        let mut tail = Vec::new();
        while let Some(item) = run.remainder.recv().await {
            tail.push(item);
        }
        assert_eq!(tail, vec![2, 3, 4], "tail stops at the declined item");
        assert!(run.handle.is_superseded());
    }
}
