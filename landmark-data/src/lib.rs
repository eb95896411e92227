//! Synchronisation and mirror resolution for landmark data sources.
//!
//! The crate keeps a local copy of each document source current and reports
//! which endpoints are reachable:
//!
//! - [`SourceRegistry`] loads, migrates and persists the configured sources.
//! - [`EndpointProbe`] checks one URL; [`HttpEndpointProbe`] does so over HTTP.
//! - [`MirrorResolver`] probes every URL of a source and recommends one.
//! - [`VersionSyncEngine`] refreshes cached documents when versions differ.
//! - [`StatusAggregator`] checks every source and streams progress.
//! - [`LandmarkService`] wires the pieces together for host applications.
//!
//! All probes share one [`ProbePool`], so the number of requests in flight
//! stays bounded however many sources and mirrors are configured.
#![forbid(unsafe_code)]

mod cache;
mod pool;
mod probe;
pub mod registry;
mod resolver;
mod service;
mod settings;
mod status;
pub mod sync;
mod task;

#[doc(hidden)]
pub mod test_support;

pub use cache::{CacheError, CacheStore, LocalCacheEntry};
pub use pool::{PoolClosed, ProbePool};
pub use probe::{
    API_SOURCE_QUERY, EndpointProbe, HttpEndpointProbe, ProbeBuildError, SCAN_WINDOW,
    TransportError, extract_version, scan_root_version,
};
pub use registry::{RegistryError, RegistrySnapshot, SourceRegistry, SwitchError};
pub use resolver::MirrorResolver;
pub use service::{LandmarkService, ServiceError};
pub use settings::{DEFAULT_USER_AGENT, REGISTRY_FILE_NAME, SyncSettings};
pub use status::{ChannelProgress, ProgressSink, StatusAggregator};
pub use sync::{SkipReason, SyncOutcome, SyncReport, VersionSyncEngine};
