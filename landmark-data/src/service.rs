//! Entry point tying the engine together for host applications.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use landmark_core::{DataSource, StatusSummary};
use log::warn;
use thiserror::Error;

use crate::cache::CacheStore;
use crate::pool::ProbePool;
use crate::probe::{EndpointProbe, HttpEndpointProbe, ProbeBuildError};
use crate::registry::SourceRegistry;
use crate::resolver::MirrorResolver;
use crate::settings::SyncSettings;
use crate::status::{ProgressSink, StatusAggregator};
use crate::sync::{SyncLog, SyncReport, VersionSyncEngine};

/// Errors raised while assembling a [`LandmarkService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The HTTP probe could not be built.
    #[error(transparent)]
    Probe(#[from] ProbeBuildError),
}

/// Owns the registry, cache, probe pool, resolver, aggregator and sync
/// engine, and exposes the operations host applications call.
#[derive(Debug)]
pub struct LandmarkService {
    registry: SourceRegistry,
    aggregator: StatusAggregator,
    sync: VersionSyncEngine,
}

impl LandmarkService {
    /// Load the registry and build the engine using HTTP probes.
    ///
    /// A sync log that cannot be opened is reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Probe`] when the HTTP client cannot be built.
    pub fn open(settings: &SyncSettings) -> Result<Self, ServiceError> {
        let probe = HttpEndpointProbe::new(settings)?;
        Ok(Self::with_probe(settings, Arc::new(probe)))
    }

    /// Build the engine around an arbitrary probe.
    #[must_use]
    pub fn with_probe(settings: &SyncSettings, probe: Arc<dyn EndpointProbe>) -> Self {
        let registry = SourceRegistry::load(settings.registry_path());
        let pool = ProbePool::new(settings.max_concurrent_probes);
        let resolver = MirrorResolver::new(Arc::clone(&probe), pool.clone(), settings.mirror_timeout);
        let aggregator = StatusAggregator::new(resolver, settings.source_timeout);
        let cache = CacheStore::new(settings.cache_dir(), settings.prefix_bytes);
        let mut sync = VersionSyncEngine::new(probe, pool, cache, settings.download_timeout);
        if let Some(path) = &settings.sync_log {
            match SyncLog::initialise(path) {
                Ok(log) => sync = sync.with_log(Arc::new(log)),
                Err(err) => warn!("{err}; cache writes will not be logged"),
            }
        }
        Self {
            registry,
            aggregator,
            sync,
        }
    }

    /// Registry of configured sources.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Bring every document source's cache up to date.
    pub async fn startup_sync(&self) -> Vec<SyncReport> {
        let sources = self.registry.all_sources();
        self.sync.sync_all(&sources).await
    }

    /// Check the reachability of every source.
    pub async fn check_status(&self, sink: &dyn ProgressSink) -> StatusSummary {
        let sources = self.registry.all_sources();
        self.aggregator.check_all(&sources, sink).await
    }

    /// The selected source.
    #[must_use]
    pub fn current_source(&self) -> Option<DataSource> {
        self.registry.current_source()
    }

    /// Every configured source keyed by name.
    #[must_use]
    pub fn all_sources(&self) -> BTreeMap<String, DataSource> {
        self.registry.all_sources()
    }

    /// Select `name` as the current source; `false` when refused.
    pub fn switch_source(&self, name: &str) -> bool {
        self.registry.switch_source(name)
    }

    /// Location of the cached document for `name`, when one exists.
    #[must_use]
    pub fn local_cache_path(&self, name: &str) -> Option<Utf8PathBuf> {
        self.sync.cache().local_cache_path(name)
    }
}
