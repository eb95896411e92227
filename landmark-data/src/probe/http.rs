//! [`EndpointProbe`] backed by `reqwest`.

use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use landmark_core::{ProbeFailure, ProbeResult};
use log::debug;
use reqwest::header::{ACCEPT, RANGE};
use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::{EndpointProbe, ProbeBuildError, TransportError, elapsed_millis, extract_version};
use crate::SyncSettings;

/// Value of the `source` query parameter sent to API sources.
pub const API_SOURCE_QUERY: &str = "zth";

const LANDMARKS_PATH: &str = "api/landmarks";
const VERSION_PATH: &str = "version";

/// HTTP implementation of [`EndpointProbe`].
///
/// One [`Client`] is shared by every request so connections are pooled.
#[derive(Debug, Clone)]
pub struct HttpEndpointProbe {
    client: Client,
    probe_timeout: Duration,
    download_timeout: Duration,
    prefix_bytes: usize,
}

impl HttpEndpointProbe {
    /// Build a probe from the engine settings.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeBuildError::HttpClient`] when the HTTP client cannot be
    /// constructed, for example because no TLS backend is available.
    pub fn new(settings: &SyncSettings) -> Result<Self, ProbeBuildError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(ProbeBuildError::HttpClient)?;
        Ok(Self {
            client,
            probe_timeout: settings.probe_timeout,
            download_timeout: settings.download_timeout,
            prefix_bytes: settings.prefix_bytes,
        })
    }

    async fn head(&self, url: &str) -> Result<(), TransportError> {
        self.client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))?;
        Ok(())
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        self.client
            .get(url)
            .timeout(timeout)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))
    }

    /// Read at most `prefix_bytes` from the start of `url`.
    ///
    /// Servers that ignore the `Range` header are cut off once the limit is
    /// reached.
    async fn read_prefix(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let last_byte = self.prefix_bytes.saturating_sub(1);
        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .header(RANGE, format!("bytes=0-{last_byte}"))
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(TransportError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: status.to_string(),
            });
        }
        let mut buffer = Vec::with_capacity(self.prefix_bytes);
        let mut stream = response.bytes_stream();
        while buffer.len() < self.prefix_bytes {
            let Some(chunk) = stream.next().await else {
                break;
            };
            let chunk = chunk.map_err(|err| convert_reqwest_error(err, url))?;
            let wanted = self.prefix_bytes - buffer.len();
            buffer.extend(chunk.iter().take(wanted));
        }
        Ok(buffer)
    }
}

#[async_trait]
impl EndpointProbe for HttpEndpointProbe {
    fn deadline(&self) -> Duration {
        self.probe_timeout
    }

    async fn probe(&self, url: &str, is_primary: bool) -> ProbeResult {
        let started = Instant::now();
        let checked = tokio::time::timeout(self.probe_timeout, self.head(url)).await;
        let latency = elapsed_millis(started);
        match checked {
            Err(_) => ProbeResult::unreachable(url, is_primary, ProbeFailure::Timeout),
            Ok(Err(err)) => {
                debug!("{err}");
                ProbeResult::unreachable(url, is_primary, err.to_failure())
            }
            Ok(Ok(())) => {
                let remaining = self.probe_timeout.saturating_sub(started.elapsed());
                let version = tokio::time::timeout(remaining, self.remote_version(url))
                    .await
                    .ok()
                    .flatten();
                ProbeResult::reachable(url, is_primary, latency, version)
            }
        }
    }

    async fn probe_api(&self, api_base_url: &str) -> ProbeResult {
        let mut url = match api_url(api_base_url, LANDMARKS_PATH) {
            Ok(url) => url,
            Err(err) => return ProbeResult::unreachable(api_base_url, true, err.to_failure()),
        };
        url.query_pairs_mut().append_pair("source", API_SOURCE_QUERY);
        let started = Instant::now();
        let checked =
            tokio::time::timeout(self.probe_timeout, self.get(url.as_str(), self.probe_timeout))
                .await;
        let latency = elapsed_millis(started);
        match checked {
            Err(_) => ProbeResult::unreachable(api_base_url, true, ProbeFailure::Timeout),
            Ok(Err(err)) => {
                debug!("{err}");
                ProbeResult::unreachable(api_base_url, true, err.to_failure())
            }
            Ok(Ok(_)) => {
                // The version read only gets what is left of the deadline.
                let remaining = self.probe_timeout.saturating_sub(started.elapsed());
                let version = match api_url(api_base_url, VERSION_PATH) {
                    Ok(version_url) => {
                        tokio::time::timeout(remaining, self.remote_version(version_url.as_str()))
                            .await
                            .ok()
                            .flatten()
                    }
                    Err(err) => {
                        debug!("{err}");
                        None
                    }
                };
                ProbeResult::reachable(api_base_url, true, latency, version)
            }
        }
    }

    async fn remote_version(&self, url: &str) -> Option<String> {
        match self.read_prefix(url).await {
            Ok(prefix) => extract_version(&String::from_utf8_lossy(&prefix)),
            Err(err) => {
                debug!("version read failed: {err}");
                None
            }
        }
    }

    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.get(url, self.download_timeout).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?;
        Ok(body.to_vec())
    }
}

fn api_url(base: &str, path: &str) -> Result<Url, TransportError> {
    let joined = format!("{}/{path}", base.trim_end_matches('/'));
    Url::parse(&joined).map_err(|source| TransportError::InvalidUrl {
        url: joined,
        source,
    })
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
