//! Keeping cached documents in step with their remotes.

use serde::Serialize;

mod audit;
mod engine;

pub use audit::{SyncLog, SyncLogError, SyncRecord};
pub use engine::VersionSyncEngine;

/// Why a source was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// API sources are queried live and never cached.
    ApiMode,
    /// Disabled sources are not contacted.
    Disabled,
    /// Another pass is already writing this source's cache.
    InFlight,
}

/// Result of synchronising one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No cache existed; one was written.
    Created {
        /// URL the document came from.
        url: String,
        /// Version of the written document.
        version: Option<String>,
        /// Bytes written.
        bytes: u64,
    },
    /// The remote version differed; the cache was replaced.
    Updated {
        /// URL the document came from.
        url: String,
        /// Version of the replaced document.
        previous: Option<String>,
        /// Version of the written document.
        current: Option<String>,
        /// Bytes written.
        bytes: u64,
    },
    /// Cached and remote versions match; nothing was written.
    UpToDate {
        /// The shared version token.
        version: Option<String>,
    },
    /// The source was not synchronised.
    Skipped {
        /// Why the source was skipped.
        reason: SkipReason,
    },
    /// Every attempt failed; any existing cache is untouched.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

impl SyncOutcome {
    /// Return `true` when this pass wrote the cache.
    #[must_use]
    pub const fn wrote_cache(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Updated { .. })
    }
}

/// Outcome of one source within a synchronisation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Source name.
    pub source: String,
    /// What happened.
    pub outcome: SyncOutcome,
}
