//! SQLite audit trail of cache writes.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, params};
use thiserror::Error;

/// Errors raised by the [`SyncLog`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncLogError {
    /// Opening or preparing the database failed.
    #[error("failed to initialise sync log at {path}: {source}")]
    Initialise {
        /// Location of the database.
        path: Utf8PathBuf,
        /// Underlying SQLite error.
        source: rusqlite::Error,
    },
    /// Inserting a row failed.
    #[error("failed to record cache write: {source}")]
    Record {
        /// Underlying SQLite error.
        source: rusqlite::Error,
    },
    /// Reading rows back failed.
    #[error("failed to query sync log: {source}")]
    Query {
        /// Underlying SQLite error.
        source: rusqlite::Error,
    },
}

/// One successful cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    /// Source whose cache was written.
    pub source: String,
    /// URL the document was downloaded from.
    pub url: String,
    /// Version found in the written document.
    pub version: Option<String>,
    /// Number of bytes written.
    pub bytes: u64,
}

/// Persisted audit trail of cache writes.
#[derive(Debug)]
pub struct SyncLog {
    connection: Mutex<Connection>,
    location: Utf8PathBuf,
}

impl SyncLog {
    /// Open (or create) the sync log at the supplied path.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::Initialise`] when the database cannot be
    /// opened or its table created.
    pub fn initialise(path: &Utf8Path) -> Result<Self, SyncLogError> {
        let initialise_error = |source| SyncLogError::Initialise {
            path: path.to_path_buf(),
            source,
        };
        landmark_fs::ensure_parent_dir(path).map_err(|err| {
            initialise_error(rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
        })?;
        let connection = Connection::open(path).map_err(initialise_error)?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS cache_writes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source TEXT NOT NULL,
                    url TEXT NOT NULL,
                    version TEXT,
                    bytes_written INTEGER NOT NULL,
                    written_at INTEGER NOT NULL
                )",
                [],
            )
            .map_err(initialise_error)?;
        Ok(Self {
            connection: Mutex::new(connection),
            location: path.to_path_buf(),
        })
    }

    /// Record a completed cache write.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::Record`] when the row cannot be inserted.
    pub fn record(&self, record: &SyncRecord) -> Result<(), SyncLogError> {
        let conversion = |err: Box<dyn std::error::Error + Send + Sync>| SyncLogError::Record {
            source: rusqlite::Error::ToSqlConversionFailure(err),
        };
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| conversion(Box::new(err)))?;
        let timestamp = i64::try_from(elapsed.as_secs()).map_err(|err| conversion(Box::new(err)))?;
        let bytes = i64::try_from(record.bytes).map_err(|err| conversion(Box::new(err)))?;
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        connection
            .execute(
                "INSERT INTO cache_writes (source, url, version, bytes_written, written_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![record.source, record.url, record.version, bytes, timestamp],
            )
            .map_err(|source| SyncLogError::Record { source })?;
        Ok(())
    }

    /// Every recorded write, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::Query`] when the rows cannot be read.
    pub fn entries(&self) -> Result<Vec<SyncRecord>, SyncLogError> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut statement = connection
            .prepare("SELECT source, url, version, bytes_written FROM cache_writes ORDER BY id")
            .map_err(|source| SyncLogError::Query { source })?;
        let rows = statement
            .query_map([], |row| {
                let bytes: i64 = row.get(3)?;
                Ok(SyncRecord {
                    source: row.get(0)?,
                    url: row.get(1)?,
                    version: row.get(2)?,
                    bytes: u64::try_from(bytes).unwrap_or_default(),
                })
            })
            .map_err(|source| SyncLogError::Query { source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| SyncLogError::Query { source })
    }

    /// Location of the underlying SQLite database.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn records_are_read_back_in_order() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("logs/sync.sqlite"))
            .expect("utf-8 path");
        let log = SyncLog::initialise(&path).expect("open log");
        let first = SyncRecord {
            source: "fletime".into(),
            url: "https://a".into(),
            version: Some("1".into()),
            bytes: 10,
        };
        let second = SyncRecord {
            source: "lynn-json".into(),
            url: "https://b".into(),
            version: None,
            bytes: 20,
        };
        log.record(&first).expect("record first");
        log.record(&second).expect("record second");

        assert_eq!(log.entries().expect("query"), vec![first, second]);
        assert_eq!(log.path(), path.as_path());
    }
}
