//! Outcome of checking a single endpoint.

use std::fmt;

/// Why an endpoint check did not produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The probe's own deadline elapsed before the server answered.
    Timeout,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The request failed below HTTP (DNS, TLS, reset, ...).
    Transport(String),
    /// The source is disabled and was not contacted.
    Disabled,
    /// The source declares no URL to check.
    NoUrl,
    /// The task running the check panicked or was cancelled.
    TaskFailed(String),
    /// The supervising timeout fired before the probe finished.
    SupervisionTimeout,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("connection timed out"),
            Self::HttpStatus(code) => write!(f, "HTTP {code}"),
            Self::Transport(message) => f.write_str(message),
            Self::Disabled => f.write_str("disabled"),
            Self::NoUrl => f.write_str("no URL configured"),
            Self::TaskFailed(message) => write!(f, "check failed: {message}"),
            Self::SupervisionTimeout => f.write_str("check timed out"),
        }
    }
}

/// Outcome of checking one URL.
///
/// `error` is present exactly when `available` is `false`.
///
/// # Examples
/// ```
/// use landmark_core::{ProbeFailure, ProbeResult};
///
/// let up = ProbeResult::reachable("https://a", true, 42, Some("3".into()));
/// assert!(up.available && up.error.is_none());
///
/// let down = ProbeResult::unreachable("https://b", false, ProbeFailure::HttpStatus(404));
/// assert_eq!(down.error.as_deref(), Some("HTTP 404"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeResult {
    /// URL that was checked.
    pub url: String,
    /// Whether the endpoint answered successfully.
    pub available: bool,
    /// Time until response headers arrived, in milliseconds.
    pub latency_millis: u64,
    /// Version token found in the response, if any.
    pub version: Option<String>,
    /// Human-readable failure; absent on success.
    pub error: Option<String>,
    /// Whether `url` is the source's primary URL.
    pub is_primary: bool,
}

impl ProbeResult {
    /// Build a successful result.
    #[must_use]
    pub fn reachable(
        url: impl Into<String>,
        is_primary: bool,
        latency_millis: u64,
        version: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            available: true,
            latency_millis,
            version,
            error: None,
            is_primary,
        }
    }

    /// Build a failed result carrying `failure` as its message.
    #[must_use]
    pub fn unreachable(url: impl Into<String>, is_primary: bool, failure: ProbeFailure) -> Self {
        Self {
            url: url.into(),
            available: false,
            latency_millis: 0,
            version: None,
            error: Some(failure.to_string()),
            is_primary,
        }
    }
}
