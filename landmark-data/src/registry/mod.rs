//! Configured data sources and the currently selected one.
//!
//! The registry is loaded once from a JSON file beside the cached documents.
//! Readers take cheap [`Arc`] snapshots; writers replace the snapshot under an
//! exclusive lock and persist it before releasing the lock, so file writes
//! never interleave.
//!
//! Loading never fails. A missing file yields the built-in sources; a file
//! that cannot be used is copied to `<file>.backup` before the defaults
//! replace it. When that copy cannot be made the defaults stay in memory and
//! the file is never written.

use std::collections::{BTreeMap, btree_map::Entry};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use camino::{Utf8Path, Utf8PathBuf};
use landmark_core::DataSource;
use log::{debug, info, warn};

mod defaults;
mod error;
mod persistence;

pub use defaults::{CURRENT_SCHEMA_VERSION, DEFAULT_CURRENT_SOURCE};
pub use error::{RegistryError, SwitchError};

/// Suffix appended to an unusable registry file before it is replaced.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Immutable view of the registry at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    sources: BTreeMap<String, DataSource>,
    current: String,
    schema_version: u32,
}

impl RegistrySnapshot {
    fn defaults() -> Self {
        Self {
            sources: defaults::default_sources(),
            current: DEFAULT_CURRENT_SOURCE.to_owned(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Every configured source keyed by name.
    #[must_use]
    pub const fn sources(&self) -> &BTreeMap<String, DataSource> {
        &self.sources
    }

    /// Name of the selected source.
    #[must_use]
    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// The selected source.
    ///
    /// Always present for snapshots handed out by [`SourceRegistry`].
    #[must_use]
    pub fn current_source(&self) -> Option<&DataSource> {
        self.sources.get(&self.current)
    }

    /// Schema version of the persisted layout.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Insert built-in sources missing from an older layout.
    ///
    /// Existing entries are never overwritten. Returns `true` when the
    /// snapshot changed.
    fn migrate(&mut self) -> bool {
        if self.schema_version >= CURRENT_SCHEMA_VERSION {
            return false;
        }
        for (name, source) in defaults::default_sources() {
            if let Entry::Vacant(slot) = self.sources.entry(name) {
                info!("restoring built-in source {:?}", slot.key());
                slot.insert(source);
            }
        }
        info!(
            "migrated source registry from schema {} to {CURRENT_SCHEMA_VERSION}",
            self.schema_version
        );
        self.schema_version = CURRENT_SCHEMA_VERSION;
        true
    }

    /// Point `current` at an enabled source.
    ///
    /// Returns `Ok(true)` when the selection had to change.
    fn settle_current(&mut self, path: &Utf8Path) -> Result<bool, RegistryError> {
        if self
            .sources
            .get(&self.current)
            .is_some_and(DataSource::is_enabled)
        {
            return Ok(false);
        }
        let fallback = self
            .sources
            .values()
            .find(|source| source.is_enabled())
            .map(|source| source.name().to_owned())
            .ok_or_else(|| RegistryError::NoEnabledSource {
                path: path.to_path_buf(),
            })?;
        warn!(
            "current source {:?} is missing or disabled; selecting {fallback:?}",
            self.current
        );
        self.current = fallback;
        Ok(true)
    }
}

/// Owner of the configured sources.
#[derive(Debug)]
pub struct SourceRegistry {
    path: Utf8PathBuf,
    state: RwLock<Arc<RegistrySnapshot>>,
    read_only: bool,
}

impl SourceRegistry {
    /// Load the registry stored at `path`, falling back to built-in defaults.
    ///
    /// Older layouts are migrated and written back; an unusable file is
    /// backed up, reported with `log::warn!`, and replaced. If the backup
    /// fails the registry runs from memory and leaves the file untouched.
    #[must_use]
    pub fn load(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let mut read_only = false;
        let (snapshot, dirty) = match Self::read_validated(&path) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                info!("no source registry at {path}; writing built-in sources");
                (RegistrySnapshot::defaults(), true)
            }
            Err(err) => {
                warn!("source registry is unusable ({err}); resetting to built-in sources");
                match landmark_fs::backup_file(&path, BACKUP_SUFFIX) {
                    Ok(backup) => info!("previous source registry kept at {backup}"),
                    Err(backup_err) => {
                        warn!(
                            "failed to back up {path}: {backup_err}; \
                             built-in sources will not be written over it"
                        );
                        read_only = true;
                    }
                }
                (RegistrySnapshot::defaults(), true)
            }
        };
        let registry = Self {
            path,
            state: RwLock::new(Arc::new(snapshot)),
            read_only,
        };
        if dirty {
            registry.save();
        }
        registry
    }

    fn read_validated(path: &Utf8Path) -> Result<Option<(RegistrySnapshot, bool)>, RegistryError> {
        let Some(mut snapshot) = persistence::read(path)? else {
            return Ok(None);
        };
        let migrated = snapshot.migrate();
        let resettled = snapshot.settle_current(path)?;
        Ok(Some((snapshot, migrated || resettled)))
    }

    /// Location of the registry file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Current immutable view.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// The selected source.
    #[must_use]
    pub fn current_source(&self) -> Option<DataSource> {
        self.snapshot().current_source().cloned()
    }

    /// Every configured source keyed by name.
    #[must_use]
    pub fn all_sources(&self) -> BTreeMap<String, DataSource> {
        self.snapshot().sources().clone()
    }

    /// Look up a source by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DataSource> {
        self.snapshot().sources().get(name).cloned()
    }

    /// Write the full registry to disk.
    ///
    /// Failures are logged and reported as `false`; the in-memory state stays
    /// authoritative.
    pub fn save(&self) -> bool {
        let guard = self.write_guard();
        self.persist(&guard)
    }

    /// Write the registry only when it differs from what is on disk.
    ///
    /// Returns `false` when a needed write failed.
    pub fn save_if_changed(&self) -> bool {
        let guard = self.write_guard();
        self.persist_if_changed(&guard)
    }

    /// Select `name` as the current source and persist the change.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError`] when the source is unknown or disabled; the
    /// selection is left unchanged.
    pub fn switch_current(&self, name: &str) -> Result<(), SwitchError> {
        let mut guard = self.write_guard();
        let target = guard
            .sources
            .get(name)
            .ok_or_else(|| SwitchError::UnknownSource {
                name: name.to_owned(),
            })?;
        if !target.is_enabled() {
            return Err(SwitchError::SourceDisabled {
                name: name.to_owned(),
            });
        }
        if guard.current != name {
            let mut next = RegistrySnapshot::clone(&guard);
            next.current = name.to_owned();
            *guard = Arc::new(next);
            info!("current source switched to {name:?}");
        }
        self.persist_if_changed(&guard);
        Ok(())
    }

    /// Boolean form of [`SourceRegistry::switch_current`].
    pub fn switch_source(&self, name: &str) -> bool {
        match self.switch_current(name) {
            Ok(()) => true,
            Err(err) => {
                debug!("switch refused: {err}");
                false
            }
        }
    }

    /// Register a new source and persist the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateSource`] when the name is taken and
    /// [`RegistryError::InvalidSource`] when the source breaks its
    /// invariants.
    pub fn add_source(&self, source: DataSource) -> Result<(), RegistryError> {
        source
            .validate()
            .map_err(|err| RegistryError::InvalidSource {
                name: source.name().to_owned(),
                source: err,
            })?;
        let mut guard = self.write_guard();
        if guard.sources.contains_key(source.name()) {
            return Err(RegistryError::DuplicateSource {
                name: source.name().to_owned(),
            });
        }
        let mut next = RegistrySnapshot::clone(&guard);
        info!("registering source {:?}", source.name());
        next.sources.insert(source.name().to_owned(), source);
        *guard = Arc::new(next);
        self.persist_if_changed(&guard);
        Ok(())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Arc<RegistrySnapshot>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether changes stay in memory because the file could not be backed up.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn persist(&self, snapshot: &RegistrySnapshot) -> bool {
        if self.read_only {
            debug!("source registry at {} is read-only; skipping write", self.path);
            return false;
        }
        match persistence::write(&self.path, snapshot) {
            Ok(()) => true,
            Err(err) => {
                warn!("{err}");
                false
            }
        }
    }

    fn persist_if_changed(&self, snapshot: &RegistrySnapshot) -> bool {
        match persistence::read(&self.path) {
            Ok(Some(on_disk)) if on_disk == *snapshot => {
                debug!("source registry unchanged; skipping write");
                true
            }
            _ => self.persist(snapshot),
        }
    }
}

#[cfg(test)]
mod tests;
