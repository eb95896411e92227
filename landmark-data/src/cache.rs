//! Local copies of document sources.
//!
//! Each document source owns `<dir>/<name>.json`. Writes go through an
//! atomic replace so readers never observe a partial document.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::probe::extract_version;

/// Errors raised while reading or writing cached documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The cached document could not be read.
    #[error("failed to read cached document {path}: {source}")]
    Read {
        /// Location of the cache file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The cached document could not be replaced.
    #[error("failed to write cached document {path}: {source}")]
    Write {
        /// Location of the cache file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// A cached document and the version found at its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCacheEntry {
    /// Name of the owning source.
    pub source: String,
    /// Location of the cache file.
    pub path: Utf8PathBuf,
    /// Raw document bytes.
    pub content: Vec<u8>,
    /// Top-level version token, if one was found.
    pub version: Option<String>,
}

/// Directory of cached documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    dir: Utf8PathBuf,
    prefix_bytes: usize,
}

impl CacheStore {
    /// Store documents under `dir`, reading `prefix_bytes` to find versions.
    ///
    /// The same prefix length is used for remote version reads, so a cached
    /// document and its unchanged remote always compare equal.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>, prefix_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            prefix_bytes,
        }
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Cache file location for `name`, whether or not it exists.
    #[must_use]
    pub fn path_for(&self, name: &str) -> Utf8PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Cache file location for `name` when the file exists.
    #[must_use]
    pub fn local_cache_path(&self, name: &str) -> Option<Utf8PathBuf> {
        let path = self.path_for(name);
        landmark_fs::file_is_file(&path)
            .ok()
            .filter(|exists| *exists)
            .map(|_| path)
    }

    /// Report whether a cache file exists for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] when existence cannot be determined.
    pub fn contains(&self, name: &str) -> Result<bool, CacheError> {
        let path = self.path_for(name);
        landmark_fs::file_is_file(&path).map_err(|source| CacheError::Read { path, source })
    }

    /// Version recorded at the start of the cached document for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] when the file cannot be read.
    pub fn read_version(&self, name: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(name);
        let prefix = landmark_fs::read_prefix(&path, self.prefix_bytes)
            .map_err(|source| CacheError::Read { path, source })?;
        Ok(extract_version(&String::from_utf8_lossy(&prefix)))
    }

    /// Load the whole cached document for `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] when the file exists but cannot be read.
    pub fn read_entry(&self, name: &str) -> Result<Option<LocalCacheEntry>, CacheError> {
        if !self.contains(name)? {
            return Ok(None);
        }
        let path = self.path_for(name);
        let content = landmark_fs::read_file(&path).map_err(|source| CacheError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Some(self.entry(name, path, content)))
    }

    /// Atomically replace the cached document for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`] when the document cannot be written; any
    /// previous copy is left intact.
    pub fn replace(&self, name: &str, content: Vec<u8>) -> Result<LocalCacheEntry, CacheError> {
        let path = self.path_for(name);
        landmark_fs::replace_file(&path, &content).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(self.entry(name, path, content))
    }

    fn entry(&self, name: &str, path: Utf8PathBuf, content: Vec<u8>) -> LocalCacheEntry {
        let prefix = content.get(..self.prefix_bytes).unwrap_or(&content);
        let version = extract_version(&String::from_utf8_lossy(prefix));
        LocalCacheEntry {
            source: name.to_owned(),
            path,
            content,
            version,
        }
    }
}
