//! The sprite service facade.

use super::config::ServiceConfig;
use crate::entity::EntityId;
use crate::executor::{ExecutorError, FetchExecutor, ShutdownOutcome};
use crate::icon::{scale_sprite, ScaledIconCache, ScaledSprite};
use crate::populate::{ListPopulator, ProgressiveRun};
use crate::preload::{PreloadCoordinator, PreloadError, PreloadOutcome, PreloadProgress};
use crate::source::{ReqwestFetcher, SourceError, SourceResolver, SpriteFetch};
use crate::store::{SpriteStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::warn;

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The entity id was empty or whitespace-only
    #[error("entity id must not be blank")]
    BlankId,

    /// HTTP client construction failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Cache directory could not be initialized
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The executor rejected the request (shutdown in progress)
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Facade over the sprite store, icon cache, executor, preloader, and
/// populator.
///
/// Every fetch runs on the shared bounded executor, never on the caller's
/// thread; callers await the returned handle (or receive channel messages)
/// and apply results to the UI with a non-blocking post.
pub struct SpriteService<C: SpriteFetch = ReqwestFetcher> {
    store: Arc<SpriteStore<C>>,
    icons: Arc<ScaledIconCache>,
    executor: Arc<FetchExecutor>,
    preloader: PreloadCoordinator<C>,
    populator: ListPopulator,
    preload_timeout: Duration,
    shutdown_grace: Duration,
}

impl SpriteService<ReqwestFetcher> {
    /// Creates a service with the real HTTP fetcher.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let fetcher = ReqwestFetcher::new()?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<C: SpriteFetch + 'static> SpriteService<C> {
    /// Creates a service with an injected fetcher.
    ///
    /// Tests use this to substitute a scripted fetcher and a temp cache
    /// directory.
    pub fn with_fetcher(config: ServiceConfig, fetcher: C) -> Result<Self, ServiceError> {
        let resolver = SourceResolver::new(config.source_templates, fetcher);
        let store = Arc::new(SpriteStore::new(config.cache_dir, resolver)?);
        let executor = Arc::new(FetchExecutor::with_parallelism(config.max_parallelism));
        let preloader = PreloadCoordinator::new(Arc::clone(&store), Arc::clone(&executor));

        Ok(Self {
            store,
            icons: Arc::new(ScaledIconCache::new()),
            executor,
            preloader,
            populator: ListPopulator::with_batch_size(config.batch_size),
            preload_timeout: config.preload_timeout,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// Returns the shared sprite store.
    pub fn store(&self) -> &Arc<SpriteStore<C>> {
        &self.store
    }

    /// Returns the shared scaled-icon cache.
    pub fn icon_cache(&self) -> &Arc<ScaledIconCache> {
        &self.icons
    }

    /// Returns the shared fetch executor.
    pub fn executor(&self) -> &Arc<FetchExecutor> {
        &self.executor
    }

    /// Fetches the original sprite bytes for an id, off the calling thread.
    ///
    /// Resolves to `Ok(None)` when no source has art for the id.
    pub fn fetch_original(
        &self,
        id: EntityId,
    ) -> Result<JoinHandle<Result<Option<Vec<u8>>, StoreError>>, ServiceError> {
        if id.is_blank() {
            return Err(ServiceError::BlankId);
        }

        let store = Arc::clone(&self.store);
        let handle = self
            .executor
            .submit(async move { store.get(&id).await })?;
        Ok(handle)
    }

    /// Fetches a pre-scaled sprite for an id, off the calling thread.
    ///
    /// Repeated calls with the same (id, size) resolve to the same shared
    /// entry.
    pub fn fetch_scaled(
        &self,
        id: EntityId,
        size: u32,
    ) -> Result<JoinHandle<Result<Option<Arc<ScaledSprite>>, StoreError>>, ServiceError> {
        if id.is_blank() {
            return Err(ServiceError::BlankId);
        }

        let store = Arc::clone(&self.store);
        let icons = Arc::clone(&self.icons);
        let handle = self
            .executor
            .submit(async move { load_scaled(store, icons, id, size).await })?;
        Ok(handle)
    }

    /// Preloads sprites for the whole entity set with the configured
    /// timeout.
    ///
    /// Progress snapshots arrive on `progress`; the consumer marshals them
    /// onto its UI loop.
    pub async fn preload_all(
        &self,
        ids: Vec<EntityId>,
        progress: UnboundedSender<PreloadProgress>,
    ) -> Result<PreloadOutcome, PreloadError> {
        self.preloader.run(ids, progress, self.preload_timeout).await
    }

    /// Progressively materializes scaled sprites for an ordered id
    /// sequence.
    ///
    /// The first batch is in `first_batch` when the call returns; the
    /// ordered tail streams on `remainder`. Ids already in the icon cache
    /// resolve without touching disk or network, so re-filtering back to a
    /// previously seen set is fast.
    ///
    /// Per-item work runs on the shared executor, so population competes
    /// for the same pool slots as every other fetch; once shutdown begins
    /// the executor rejects the next item and the run ends there.
    pub async fn populate_scaled(
        &self,
        ids: Vec<EntityId>,
        size: u32,
    ) -> ProgressiveRun<(EntityId, Option<Arc<ScaledSprite>>)> {
        let store = Arc::clone(&self.store);
        let icons = Arc::clone(&self.icons);
        let executor = Arc::clone(&self.executor);

        self.populator
            .populate(ids, move |id| {
                let store = Arc::clone(&store);
                let icons = Arc::clone(&icons);
                let executor = Arc::clone(&executor);
                async move {
                    let handle = match executor
                        .submit(load_scaled(store, icons, id.clone(), size))
                    {
                        Ok(handle) => handle,
                        Err(ExecutorError::ShuttingDown) => return None,
                    };

                    let sprite = match handle.await {
                        Ok(Ok(sprite)) => sprite,
                        Ok(Err(e)) => {
                            warn!(id = %id, error = %e, "sprite materialization failed");
                            None
                        }
                        Err(e) => {
                            warn!(id = %id, error = %e, "sprite materialization task failed");
                            None
                        }
                    };
                    Some((id, sprite))
                }
            })
            .await
    }

    /// Shuts down the executor with the configured grace period.
    ///
    /// A [`ShutdownOutcome::ForcedAfterTimeout`] is degraded but
    /// recoverable; the disk cache is consistent regardless.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        self.executor.shutdown(self.shutdown_grace).await
    }
}

/// Loads a scaled sprite through the icon cache, reading through to the
/// store on a miss.
async fn load_scaled<C: SpriteFetch>(
    store: Arc<SpriteStore<C>>,
    icons: Arc<ScaledIconCache>,
    id: EntityId,
    size: u32,
) -> Result<Option<Arc<ScaledSprite>>, StoreError> {
    icons
        .get_or_compute(&id, size, || async {
            match store.get(&id).await? {
                Some(bytes) => match scale_sprite(&id, &bytes, size) {
                    Ok(sprite) => Ok(Some(sprite)),
                    Err(e) => {
                        // Store bytes always decoded once at fetch time, so
                        // this is unexpected; degrade to "no image".
                        warn!(id = %id, error = %e, "scaling cached sprite failed");
                        Ok(None)
                    }
                },
                None => Ok(None),
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct ScriptedFetcher {
        responses: Arc<HashMap<String, Vec<u8>>>,
        calls: Arc<AtomicUsize>,
    }

    impl SpriteFetch for ScriptedFetcher {
        async fn get(&self, url: &str) -> Result<Vec<u8>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::Http(format!("HTTP 404 from {}", url)))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(16, 16, image::Rgba([200, 30, 30, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn service_with(
        dir: &TempDir,
        responses: HashMap<String, Vec<u8>>,
    ) -> (SpriteService<ScriptedFetcher>, ScriptedFetcher) {
        let fetcher = ScriptedFetcher {
            responses: Arc::new(responses),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let config = ServiceConfig::default()
            .with_cache_dir(dir.path())
            .with_source_templates(vec!["http://sprites/{id}.png".to_string()])
            .with_max_parallelism(4);
        let service = SpriteService::with_fetcher(config, fetcher.clone()).unwrap();
        (service, fetcher)
    }

    #[tokio::test]
    async fn test_fetch_original_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut responses = HashMap::new();
        responses.insert("http://sprites/25.png".to_string(), png_bytes());
        let (service, _) = service_with(&dir, responses);

        let bytes = service
            .fetch_original(EntityId::from("25"))
            .unwrap()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bytes, Some(png_bytes()));
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (service, fetcher) = service_with(&dir, HashMap::new());

        assert!(matches!(
            service.fetch_original(EntityId::from("  ")),
            Err(ServiceError::BlankId)
        ));
        assert!(matches!(
            service.fetch_scaled(EntityId::from(""), 130),
            Err(ServiceError::BlankId)
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_scaled_memoizes() {
        let dir = TempDir::new().unwrap();
        let mut responses = HashMap::new();
        responses.insert("http://sprites/25.png".to_string(), png_bytes());
        let (service, _) = service_with(&dir, responses);
        let id = EntityId::from("25");

        let first = service
            .fetch_scaled(id.clone(), 130)
            .unwrap()
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let second = service
            .fetch_scaled(id, 130)
            .unwrap()
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(first.size(), 130);
        assert!(Arc::ptr_eq(&first, &second), "same (id, size) shares one entry");
        assert_eq!(service.icon_cache().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_scaled_missing_sprite_is_none() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service_with(&dir, HashMap::new());

        let result = service
            .fetch_scaled(EntityId::from("99999"), 130)
            .unwrap()
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_populate_after_shutdown_ends_run_without_fetching() {
        let dir = TempDir::new().unwrap();
        let mut responses = HashMap::new();
        for i in 0..5 {
            responses.insert(format!("http://sprites/{}.png", i), png_bytes());
        }
        let (service, fetcher) = service_with(&dir, responses);

        service.shutdown().await;

        let ids: Vec<EntityId> = (0..5u32).map(EntityId::from).collect();
        let mut run = service.populate_scaled(ids, 96).await;

        assert!(run.first_batch.is_empty(), "no item may run off the pool");
        assert!(run.remainder.recv().await.is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_populate_work_is_tracked_by_the_executor() {
        let dir = TempDir::new().unwrap();
        let mut responses = HashMap::new();
        for i in 0..3 {
            responses.insert(format!("http://sprites/{}.png", i), png_bytes());
        }
        let (service, fetcher) = service_with(&dir, responses);

        let ids: Vec<EntityId> = (0..3u32).map(EntityId::from).collect();
        let run = service.populate_scaled(ids, 96).await;
        assert_eq!(run.first_batch.len(), 3);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        // All population work went through the pool and has drained by now
        let outcome = service.shutdown().await;
        assert_eq!(outcome, ShutdownOutcome::Clean);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service_with(&dir, HashMap::new());

        let outcome = service.shutdown().await;
        assert_eq!(outcome, ShutdownOutcome::Clean);

        assert!(matches!(
            service.fetch_original(EntityId::from("1")),
            Err(ServiceError::Executor(ExecutorError::ShuttingDown))
        ));
    }
}
