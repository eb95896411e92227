//! Facade crate for the landmark source engine.
//!
//! This crate re-exports the source and status domain types and, behind the
//! `engine` feature, the registry, probes and sync engine that act on them.

#![forbid(unsafe_code)]

pub use landmark_core::{
    DataSource, DataSourceError, MirrorReport, ProbeFailure, ProbeResult, SourceMode,
    SourceStatusReport, StatusProgress, StatusSummary, recommend,
};

#[cfg(feature = "engine")]
pub use landmark_data::{
    EndpointProbe, HttpEndpointProbe, LandmarkService, MirrorResolver, ProgressSink,
    ServiceError, SourceRegistry, StatusAggregator, SwitchError, SyncOutcome, SyncReport,
    SyncSettings, VersionSyncEngine,
};
