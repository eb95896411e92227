//! Version-driven cache refresh.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use landmark_core::DataSource;
use log::{debug, info, warn};
use tokio::task::JoinSet;

use super::{SkipReason, SyncLog, SyncOutcome, SyncRecord, SyncReport};
use crate::cache::{CacheStore, LocalCacheEntry};
use crate::pool::ProbePool;
use crate::probe::EndpointProbe;
use crate::task::catch_panic;

/// Brings each document source's cache in line with its remote.
///
/// A cache with no entry is filled from the first URL that serves the
/// document. An existing entry is replaced only when the remote's version
/// token differs from the cached one. Passes for the same source never
/// overlap; passes for different sources run independently.
#[derive(Clone)]
pub struct VersionSyncEngine {
    probe: Arc<dyn EndpointProbe>,
    pool: ProbePool,
    cache: CacheStore,
    download_timeout: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
    log: Option<Arc<SyncLog>>,
}

impl std::fmt::Debug for VersionSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionSyncEngine")
            .field("cache", &self.cache)
            .field("download_timeout", &self.download_timeout)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

struct InFlight {
    names: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

impl VersionSyncEngine {
    /// Create an engine writing into `cache`.
    #[must_use]
    pub fn new(
        probe: Arc<dyn EndpointProbe>,
        pool: ProbePool,
        cache: CacheStore,
        download_timeout: Duration,
    ) -> Self {
        Self {
            probe,
            pool,
            cache,
            download_timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            log: None,
        }
    }

    /// Record every cache write in `log`.
    #[must_use]
    pub fn with_log(mut self, log: Arc<SyncLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Cache the engine writes into.
    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn claim(&self, name: &str) -> Option<InFlight> {
        let mut names = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        names.insert(name.to_owned()).then(|| InFlight {
            names: Arc::clone(&self.in_flight),
            name: name.to_owned(),
        })
    }

    /// Synchronise one source.
    pub async fn sync_source(&self, source: &DataSource) -> SyncOutcome {
        if source.is_api_mode() {
            return SyncOutcome::Skipped {
                reason: SkipReason::ApiMode,
            };
        }
        if !source.is_enabled() {
            return SyncOutcome::Skipped {
                reason: SkipReason::Disabled,
            };
        }
        let Some(_claim) = self.claim(source.name()) else {
            debug!("sync of {:?} already running", source.name());
            return SyncOutcome::Skipped {
                reason: SkipReason::InFlight,
            };
        };
        let outcome = match self.cache.contains(source.name()) {
            Ok(false) => self.create(source).await,
            Ok(true) => self.refresh(source).await,
            Err(err) => SyncOutcome::Failed {
                reason: err.to_string(),
            },
        };
        if let SyncOutcome::Failed { reason } = &outcome {
            warn!("sync of {:?} failed: {reason}", source.name());
        }
        outcome
    }

    async fn create(&self, source: &DataSource) -> SyncOutcome {
        match self.download(source).await {
            Ok((url, entry)) => {
                info!("cached {:?} from {url}", source.name());
                SyncOutcome::Created {
                    url,
                    version: entry.version,
                    bytes: byte_count(&entry.content),
                }
            }
            Err(reason) => SyncOutcome::Failed { reason },
        }
    }

    async fn refresh(&self, source: &DataSource) -> SyncOutcome {
        let cached = self.cache.read_version(source.name());
        if let Err(err) = &cached {
            warn!("{err}; downloading a fresh copy");
        }
        let remote = match source.all_urls().first() {
            Some(primary) => self.remote_version(primary).await,
            None => None,
        };
        let previous = match cached {
            Ok(version) if version == remote => {
                debug!("{:?} is up to date", source.name());
                return SyncOutcome::UpToDate { version };
            }
            Ok(version) => version,
            Err(_) => None,
        };
        match self.download(source).await {
            Ok((url, entry)) => {
                info!(
                    "updated {:?} from {previous:?} to {:?}",
                    source.name(),
                    entry.version
                );
                SyncOutcome::Updated {
                    url,
                    previous,
                    current: entry.version,
                    bytes: byte_count(&entry.content),
                }
            }
            Err(reason) => SyncOutcome::Failed { reason },
        }
    }

    async fn remote_version(&self, url: &str) -> Option<String> {
        let limit = self.probe.deadline();
        let read = self
            .pool
            .run(async { tokio::time::timeout(limit, self.probe.remote_version(url)).await })
            .await;
        match read {
            Ok(Ok(version)) => version,
            Ok(Err(_elapsed)) => {
                debug!("version read of {url} exceeded {limit:?}");
                None
            }
            Err(closed) => {
                debug!("version read of {url} skipped: {closed}");
                None
            }
        }
    }

    /// Download from each URL in order until one succeeds, then replace the
    /// cache.
    async fn download(&self, source: &DataSource) -> Result<(String, LocalCacheEntry), String> {
        let urls = source.all_urls();
        let mut last_error = String::from("no URL configured");
        for url in &urls {
            // Full downloads run outside the probe pool.
            let fetched =
                tokio::time::timeout(self.download_timeout, self.probe.fetch_document(url)).await;
            let body = match fetched {
                Ok(Ok(body)) => body,
                Ok(Err(err)) => {
                    last_error = err.to_string();
                    debug!("download from {url} failed: {last_error}; trying next URL");
                    continue;
                }
                Err(_elapsed) => {
                    last_error = format!("download from {url} timed out");
                    debug!("{last_error}; trying next URL");
                    continue;
                }
            };
            let entry = self
                .cache
                .replace(source.name(), body)
                .map_err(|err| err.to_string())?;
            self.record(source, url, &entry);
            return Ok(((*url).to_owned(), entry));
        }
        Err(format!(
            "all {} URL(s) failed; last error: {last_error}",
            urls.len()
        ))
    }

    fn record(&self, source: &DataSource, url: &str, entry: &LocalCacheEntry) {
        let Some(log) = &self.log else {
            return;
        };
        let record = SyncRecord {
            source: source.name().to_owned(),
            url: url.to_owned(),
            version: entry.version.clone(),
            bytes: byte_count(&entry.content),
        };
        if let Err(err) = log.record(&record) {
            warn!("{err}");
        }
    }

    /// Synchronise every source concurrently.
    ///
    /// Reports are ordered by source name. A panic while synchronising one
    /// source becomes a [`SyncOutcome::Failed`] for that source only.
    pub async fn sync_all(&self, sources: &BTreeMap<String, DataSource>) -> Vec<SyncReport> {
        let mut tasks = JoinSet::new();
        for (index, source) in sources.values().enumerate() {
            let engine = self.clone();
            let source = source.clone();
            tasks.spawn(async move {
                let outcome = match catch_panic(engine.sync_source(&source)).await {
                    Ok(outcome) => outcome,
                    Err(message) => SyncOutcome::Failed {
                        reason: format!("sync panicked: {message}"),
                    },
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<SyncOutcome>> = vec![None; sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(err) => warn!("sync task did not join: {err}"),
            }
        }

        sources
            .keys()
            .zip(slots)
            .map(|(name, slot)| SyncReport {
                source: name.clone(),
                outcome: slot.unwrap_or_else(|| SyncOutcome::Failed {
                    reason: "sync task was cancelled".to_owned(),
                }),
            })
            .collect()
    }
}

fn byte_count(content: &[u8]) -> u64 {
    u64::try_from(content.len()).unwrap_or(u64::MAX)
}
