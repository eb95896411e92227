//! Single-endpoint reachability and version checks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use landmark_core::ProbeResult;

mod error;
mod http;
mod version;

pub use error::{ProbeBuildError, TransportError};
pub use http::{API_SOURCE_QUERY, HttpEndpointProbe};
pub use version::{SCAN_WINDOW, extract_version, scan_root_version};

/// Performs bounded-time checks against individual URLs.
///
/// Implementations enforce their own deadline; callers may add a supervising
/// timeout but must not make it shorter than [`EndpointProbe::deadline`].
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    /// Longest time a single [`EndpointProbe::probe`] call may take.
    fn deadline(&self) -> Duration;

    /// Check that `url` exists and, when it does, read its version token.
    async fn probe(&self, url: &str, is_primary: bool) -> ProbeResult;

    /// Check that an API source answers queries and read its version.
    async fn probe_api(&self, api_base_url: &str) -> ProbeResult;

    /// Read only the version token of the document at `url`.
    async fn remote_version(&self, url: &str) -> Option<String>;

    /// Download the whole document at `url`.
    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

pub(crate) fn elapsed_millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
