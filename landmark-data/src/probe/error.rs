//! Transport-level failures.

use std::io;

use landmark_core::ProbeFailure;
use thiserror::Error;

/// Errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The URL could not be parsed.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },
}

impl TransportError {
    /// Map the error onto the short failure reported in probe results.
    #[must_use]
    pub fn to_failure(&self) -> ProbeFailure {
        match self {
            Self::Http { status, .. } => ProbeFailure::HttpStatus(*status),
            Self::Network { source, .. } if source.kind() == io::ErrorKind::TimedOut => {
                ProbeFailure::Timeout
            }
            Self::Network { source, .. } => ProbeFailure::Transport(source.to_string()),
            Self::InvalidUrl { source, .. } => ProbeFailure::Transport(source.to_string()),
        }
    }
}

/// Error type for [`crate::HttpEndpointProbe`] construction failures.
#[derive(Debug, Error)]
pub enum ProbeBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
