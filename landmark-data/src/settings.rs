//! Engine-wide tuning knobs.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

/// Default user agent for probe and download requests.
pub const DEFAULT_USER_AGENT: &str = "landmark-sync/0.1";

/// File name of the persisted source registry inside the config directory.
pub const REGISTRY_FILE_NAME: &str = "config.json";

const DEFAULT_CONFIG_DIR: &str = "config/landmark-sync";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_CONCURRENT_PROBES: usize = 8;
const DEFAULT_PREFIX_BYTES: usize = 2048;

/// Settings shared by the registry, probes, resolver, aggregator and sync
/// engine.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use landmark_data::SyncSettings;
///
/// let settings = SyncSettings::new("/tmp/landmarks")
///     .with_probe_timeout(Duration::from_millis(500))
///     .with_max_concurrent_probes(2);
/// assert_eq!(settings.registry_path().as_str(), "/tmp/landmarks/config.json");
/// assert_eq!(settings.prefix_bytes, 2048);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Directory holding the registry file and cached documents.
    pub config_dir: Utf8PathBuf,
    /// Hard deadline for a single endpoint probe.
    pub probe_timeout: Duration,
    /// Connection timeout applied to every request.
    pub connect_timeout: Duration,
    /// Deadline for downloading a whole document.
    pub download_timeout: Duration,
    /// Supervision window for each mirror check.
    pub mirror_timeout: Duration,
    /// Supervision window for each source in a status pass.
    pub source_timeout: Duration,
    /// Upper bound on probes in flight across the process.
    pub max_concurrent_probes: usize,
    /// Bytes read from the start of a document to find its version.
    pub prefix_bytes: usize,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Optional SQLite file recording every cache write.
    pub sync_log: Option<Utf8PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            config_dir: Utf8PathBuf::from(DEFAULT_CONFIG_DIR),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            mirror_timeout: DEFAULT_MIRROR_TIMEOUT,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            prefix_bytes: DEFAULT_PREFIX_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            sync_log: None,
        }
    }
}

impl SyncSettings {
    /// Create settings rooted at `config_dir`.
    #[must_use]
    pub fn new(config_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Default::default()
        }
    }

    /// Set the probe deadline.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the document download deadline.
    #[must_use]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Set the per-mirror supervision window.
    #[must_use]
    pub fn with_mirror_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_timeout = timeout;
        self
    }

    /// Set the per-source supervision window.
    #[must_use]
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Set the probe concurrency bound. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_probes(mut self, limit: usize) -> Self {
        self.max_concurrent_probes = limit.max(1);
        self
    }

    /// Set how many leading bytes are read when looking for a version.
    #[must_use]
    pub fn with_prefix_bytes(mut self, bytes: usize) -> Self {
        self.prefix_bytes = bytes;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Record cache writes in a SQLite log at `path`.
    #[must_use]
    pub fn with_sync_log(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.sync_log = Some(path.into());
        self
    }

    /// Location of the persisted registry.
    #[must_use]
    pub fn registry_path(&self) -> Utf8PathBuf {
        self.config_dir.join(REGISTRY_FILE_NAME)
    }

    /// Directory holding cached documents.
    #[must_use]
    pub fn cache_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
