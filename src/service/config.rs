//! Service configuration.

use crate::executor::default_fetch_parallelism;
use crate::populate::DEFAULT_BATCH_SIZE;
use crate::preload::DEFAULT_PRELOAD_TIMEOUT;
use crate::source::DEFAULT_SOURCE_TEMPLATES;
use std::path::PathBuf;
use std::time::Duration;

/// Default grace period for executor shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Complete sprite service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cache directory for sprite artifacts and negative markers
    pub cache_dir: PathBuf,
    /// Source URL templates in priority order, each containing `{id}`
    pub source_templates: Vec<String>,
    /// Fetch pool size (default: `max(4, cpus * 2)`)
    pub max_parallelism: usize,
    /// Head batch size for progressive list population
    pub batch_size: usize,
    /// Global bulk preload timeout
    pub preload_timeout: Duration,
    /// Grace period before shutdown force-cancels outstanding work
    pub shutdown_grace: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spritedex");

        Self {
            cache_dir,
            source_templates: DEFAULT_SOURCE_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            max_parallelism: default_fetch_parallelism(),
            batch_size: DEFAULT_BATCH_SIZE,
            preload_timeout: DEFAULT_PRELOAD_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ServiceConfig {
    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the source templates, highest quality first.
    pub fn with_source_templates(mut self, templates: Vec<String>) -> Self {
        self.source_templates = templates;
        self
    }

    /// Set the fetch pool size.
    pub fn with_max_parallelism(mut self, workers: usize) -> Self {
        self.max_parallelism = workers;
        self
    }

    /// Set the head batch size for progressive population.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the global preload timeout.
    pub fn with_preload_timeout(mut self, timeout: Duration) -> Self {
        self.preload_timeout = timeout;
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
