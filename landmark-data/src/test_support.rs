//! Test utilities for code that drives an [`EndpointProbe`].
//!
//! [`StubProbe`] answers from a per-URL script instead of the network, so
//! resolver, aggregator and sync behaviour can be exercised deterministically,
//! including probes that hang or panic.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use landmark_core::{ProbeFailure, ProbeResult};

use crate::probe::{EndpointProbe, TransportError};

/// Scripted response for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubBehaviour {
    /// Answer after `latency_millis` (simulated with a Tokio sleep).
    Reachable {
        /// Latency to wait and report.
        latency_millis: u64,
        /// Version reported by probes and version reads.
        version: Option<String>,
    },
    /// Fail immediately with `failure`.
    Unreachable(ProbeFailure),
    /// Never complete.
    Hang,
    /// Panic when called.
    Panic,
}

impl StubBehaviour {
    /// Shorthand for [`StubBehaviour::Reachable`].
    #[must_use]
    pub fn reachable(latency_millis: u64, version: Option<&str>) -> Self {
        Self::Reachable {
            latency_millis,
            version: version.map(str::to_owned),
        }
    }

    /// Shorthand for [`StubBehaviour::Unreachable`].
    #[must_use]
    pub const fn unreachable(failure: ProbeFailure) -> Self {
        Self::Unreachable(failure)
    }
}

#[derive(Debug, Default)]
struct Calls {
    probes: AtomicUsize,
    version_reads: AtomicUsize,
    downloads: AtomicUsize,
}

/// Stub [`EndpointProbe`] backed by in-memory scripts and documents.
///
/// URLs without a script fail with a transport error. Clones share call
/// counters.
#[derive(Debug, Clone)]
pub struct StubProbe {
    behaviours: HashMap<String, StubBehaviour>,
    documents: HashMap<String, Vec<u8>>,
    deadline: Duration,
    calls: Arc<Calls>,
}

impl Default for StubProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProbe {
    /// Create a stub with no scripts and a two second deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            behaviours: HashMap::new(),
            documents: HashMap::new(),
            deadline: Duration::from_secs(2),
            calls: Arc::new(Calls::default()),
        }
    }

    /// Script the behaviour of `url` for probes and version reads.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, behaviour: StubBehaviour) -> Self {
        self.behaviours.insert(url.into(), behaviour);
        self
    }

    /// Serve `body` when `url` is downloaded.
    #[must_use]
    pub fn with_document(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }

    /// Override the advertised deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Number of `probe` and `probe_api` calls so far.
    #[must_use]
    pub fn probe_calls(&self) -> usize {
        self.calls.probes.load(Ordering::SeqCst)
    }

    /// Number of `remote_version` calls so far.
    #[must_use]
    pub fn version_reads(&self) -> usize {
        self.calls.version_reads.load(Ordering::SeqCst)
    }

    /// Number of `fetch_document` calls so far.
    #[must_use]
    pub fn downloads(&self) -> usize {
        self.calls.downloads.load(Ordering::SeqCst)
    }

    async fn answer(&self, url: &str, is_primary: bool) -> ProbeResult {
        self.calls.probes.fetch_add(1, Ordering::SeqCst);
        match self.behaviours.get(url) {
            Some(StubBehaviour::Reachable {
                latency_millis,
                version,
            }) => {
                tokio::time::sleep(Duration::from_millis(*latency_millis)).await;
                ProbeResult::reachable(url, is_primary, *latency_millis, version.clone())
            }
            Some(StubBehaviour::Unreachable(failure)) => {
                ProbeResult::unreachable(url, is_primary, failure.clone())
            }
            Some(StubBehaviour::Hang) => std::future::pending().await,
            Some(StubBehaviour::Panic) => panic!("stub probe panicked for {url}"),
            None => ProbeResult::unreachable(
                url,
                is_primary,
                ProbeFailure::Transport(format!("no stub for {url}")),
            ),
        }
    }
}

#[async_trait]
impl EndpointProbe for StubProbe {
    fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn probe(&self, url: &str, is_primary: bool) -> ProbeResult {
        self.answer(url, is_primary).await
    }

    async fn probe_api(&self, api_base_url: &str) -> ProbeResult {
        self.answer(api_base_url, true).await
    }

    async fn remote_version(&self, url: &str) -> Option<String> {
        self.calls.version_reads.fetch_add(1, Ordering::SeqCst);
        match self.behaviours.get(url) {
            Some(StubBehaviour::Reachable { version, .. }) => version.clone(),
            Some(StubBehaviour::Hang) => std::future::pending().await,
            Some(StubBehaviour::Panic) => panic!("stub version read panicked for {url}"),
            Some(StubBehaviour::Unreachable(_)) | None => None,
        }
    }

    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.calls.downloads.fetch_add(1, Ordering::SeqCst);
        if matches!(self.behaviours.get(url), Some(StubBehaviour::Panic)) {
            panic!("stub download panicked for {url}");
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Network {
                url: url.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "no stub document"),
            })
    }
}

/// Run `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
pub fn block_on_for_tests<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("failed to build Tokio runtime: {err}"))
        .block_on(future)
}
