use chrono::{DateTime, Utc};
use std::sync::Arc;

use docforge_core::artifact::ArtifactStore;
use docforge_core::format::FormatRegistry;
use docforge_core::job::JobTracker;
use docforge_core::pool::ProcessPoolManager;
use docforge_core::router::FallbackRouter;
use docforge_core::{Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<ArtifactStore>,
    pool: Arc<ProcessPoolManager>,
    registry: Arc<FormatRegistry>,
    tracker: Arc<JobTracker>,
    router: Arc<FallbackRouter>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<ArtifactStore>,
        pool: Arc<ProcessPoolManager>,
        registry: Arc<FormatRegistry>,
        tracker: Arc<JobTracker>,
        router: Arc<FallbackRouter>,
    ) -> Self {
        Self {
            config,
            store,
            pool,
            registry,
            tracker,
            router,
            started_at: Utc::now(),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.config.storage.max_upload_bytes
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<ProcessPoolManager> {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn router(&self) -> &Arc<FallbackRouter> {
        &self.router
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
