//! Error types produced by the source registry.

use std::io;

use camino::Utf8PathBuf;
use landmark_core::DataSourceError;
use thiserror::Error;

/// Errors raised while reading, validating or writing the registry file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("failed to read source registry {path}: {source}")]
    Read {
        /// Location of the registry file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The registry file is not valid JSON for the expected schema.
    #[error("failed to parse source registry {path}: {source}")]
    Parse {
        /// Location of the registry file.
        path: Utf8PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// The registry declared no sources at all.
    #[error("source registry {path} declares no sources")]
    Empty {
        /// Location of the registry file.
        path: Utf8PathBuf,
    },
    /// No source in the registry is enabled.
    #[error("source registry {path} has no enabled source")]
    NoEnabledSource {
        /// Location of the registry file.
        path: Utf8PathBuf,
    },
    /// A persisted record violates the source invariants.
    #[error("source {name:?} is invalid: {source}")]
    InvalidSource {
        /// Map key of the offending record.
        name: String,
        /// Violated invariant.
        source: DataSourceError,
    },
    /// A source with the same name is already registered.
    #[error("source {name:?} is already registered")]
    DuplicateSource {
        /// Name of the existing source.
        name: String,
    },
    /// Serialising the registry failed.
    #[error("failed to encode source registry: {source}")]
    Encode {
        /// Underlying serialisation error.
        source: serde_json::Error,
    },
    /// Writing the registry file failed.
    #[error("failed to write source registry {path}: {source}")]
    Write {
        /// Location of the registry file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Reasons a switch of the current source is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SwitchError {
    /// No source with that name exists.
    #[error("unknown source {name:?}")]
    UnknownSource {
        /// Requested name.
        name: String,
    },
    /// The source exists but is disabled.
    #[error("source {name:?} is disabled")]
    SourceDisabled {
        /// Requested name.
        name: String,
    },
}
