//! Concurrent checks across every URL of one source.

use std::sync::Arc;
use std::time::Duration;

use landmark_core::{DataSource, MirrorReport, ProbeFailure, ProbeResult};
use log::debug;
use tokio::task::JoinSet;

use crate::pool::ProbePool;
use crate::probe::EndpointProbe;
use crate::task::catch_panic;

/// Probes every URL of a source and recommends the fastest one.
#[derive(Clone)]
pub struct MirrorResolver {
    probe: Arc<dyn EndpointProbe>,
    pool: ProbePool,
    mirror_timeout: Duration,
}

impl std::fmt::Debug for MirrorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorResolver")
            .field("pool", &self.pool)
            .field("mirror_timeout", &self.mirror_timeout)
            .finish_non_exhaustive()
    }
}

impl MirrorResolver {
    /// Create a resolver sharing `pool` with the rest of the engine.
    #[must_use]
    pub fn new(probe: Arc<dyn EndpointProbe>, pool: ProbePool, mirror_timeout: Duration) -> Self {
        Self {
            probe,
            pool,
            mirror_timeout,
        }
    }

    /// Supervision window applied to each probe.
    ///
    /// Never shorter than the probe's own deadline.
    #[must_use]
    pub fn supervision(&self) -> Duration {
        self.mirror_timeout.max(self.probe.deadline())
    }

    /// Time needed to check `url_count` URLs when they queue for the pool.
    ///
    /// One supervision window per round of `capacity` probes.
    #[must_use]
    pub fn window_for(&self, url_count: usize) -> Duration {
        let rounds = url_count.div_ceil(self.pool.capacity()).max(1);
        self.supervision()
            .saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
    }

    /// Probe every URL of `source` concurrently.
    ///
    /// The report holds exactly one result per URL, in URL order. Probes that
    /// overrun the supervision window or panic yield synthetic failures.
    pub async fn resolve(&self, source: &DataSource) -> MirrorReport {
        self.collect(source, None).await
    }

    /// Like [`MirrorResolver::resolve`], but stop waiting after `window`.
    ///
    /// Results gathered so far are kept; URLs still queued or running are
    /// reported as [`ProbeFailure::SupervisionTimeout`] and their checks are
    /// aborted.
    pub async fn resolve_within(&self, source: &DataSource, window: Duration) -> MirrorReport {
        self.collect(source, Some(window)).await
    }

    async fn collect(&self, source: &DataSource, window: Option<Duration>) -> MirrorReport {
        let urls: Vec<String> = source.all_urls().into_iter().map(str::to_owned).collect();
        let limit = self.supervision();
        let mut tasks = JoinSet::new();
        for (index, url) in urls.iter().enumerate() {
            let probe = Arc::clone(&self.probe);
            let pool = self.pool.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let is_primary = index == 0;
                let outcome =
                    catch_panic(supervised_probe(probe, pool, &url, is_primary, limit)).await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(message) => {
                        ProbeResult::unreachable(url, is_primary, ProbeFailure::TaskFailed(message))
                    }
                };
                (index, result)
            });
        }

        let deadline = window.map(|window| tokio::time::Instant::now() + window);
        let mut expired = false;
        let mut slots: Vec<Option<ProbeResult>> = vec![None; urls.len()];
        loop {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_elapsed) => {
                        debug!("mirror checks for {:?} ran out of time", source.name());
                        expired = true;
                        break;
                    }
                },
                None => tasks.join_next().await,
            };
            let Some(joined) = joined else {
                break;
            };
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(err) => debug!("mirror check for {:?} did not join: {err}", source.name()),
            }
        }
        tasks.abort_all();

        let results = slots
            .into_iter()
            .zip(urls)
            .enumerate()
            .map(|(index, (slot, url))| {
                slot.unwrap_or_else(|| {
                    let failure = if expired {
                        ProbeFailure::SupervisionTimeout
                    } else {
                        ProbeFailure::TaskFailed("check was cancelled".to_owned())
                    };
                    ProbeResult::unreachable(url, index == 0, failure)
                })
            })
            .collect();
        MirrorReport::from_results(results)
    }

    /// Check an API source under the same supervision as a mirror.
    pub async fn probe_api(&self, api_base_url: &str) -> ProbeResult {
        let limit = self.supervision();
        let supervised = self
            .pool
            .run(async { tokio::time::timeout(limit, self.probe.probe_api(api_base_url)).await })
            .await;
        match supervised {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => {
                ProbeResult::unreachable(api_base_url, true, ProbeFailure::SupervisionTimeout)
            }
            Err(closed) => ProbeResult::unreachable(
                api_base_url,
                true,
                ProbeFailure::TaskFailed(closed.to_string()),
            ),
        }
    }
}

async fn supervised_probe(
    probe: Arc<dyn EndpointProbe>,
    pool: ProbePool,
    url: &str,
    is_primary: bool,
    limit: Duration,
) -> ProbeResult {
    // The window opens once a permit is held, not while queueing for one.
    let supervised = pool
        .run(async { tokio::time::timeout(limit, probe.probe(url, is_primary)).await })
        .await;
    match supervised {
        Ok(Ok(result)) => result,
        Ok(Err(_elapsed)) => {
            debug!("probe of {url} exceeded {limit:?}");
            ProbeResult::unreachable(url, is_primary, ProbeFailure::SupervisionTimeout)
        }
        Err(closed) => {
            ProbeResult::unreachable(url, is_primary, ProbeFailure::TaskFailed(closed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubBehaviour, StubProbe};
    use rstest::rstest;

    fn three_urls() -> DataSource {
        DataSource::document(
            "lynn-json",
            "Lynn",
            Some("https://primary".into()),
            vec!["https://mirror-1".into(), "https://mirror-2".into()],
        )
        .expect("valid source")
    }

    fn resolver(probe: StubProbe) -> MirrorResolver {
        MirrorResolver::new(Arc::new(probe), ProbePool::new(4), Duration::from_secs(3))
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn fastest_mirror_is_recommended() {
        let probe = StubProbe::new()
            .with("https://primary", StubBehaviour::reachable(300, Some("3")))
            .with("https://mirror-1", StubBehaviour::reachable(200, Some("3")))
            .with("https://mirror-2", StubBehaviour::reachable(40, Some("3")));

        let report = resolver(probe).resolve(&three_urls()).await;

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.recommended, Some(2));
        let best = report.best().expect("a recommendation");
        assert_eq!(best.url, "https://mirror-2");
        assert!(!best.is_primary);
        assert!(report.results.first().is_some_and(|r| r.is_primary));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn every_url_is_reported_when_all_hang() {
        let probe = StubProbe::new()
            .with("https://primary", StubBehaviour::Hang)
            .with("https://mirror-1", StubBehaviour::Hang)
            .with("https://mirror-2", StubBehaviour::Hang);

        let report = resolver(probe).resolve(&three_urls()).await;

        let urls: Vec<_> = report.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://primary", "https://mirror-1", "https://mirror-2"]);
        assert!(report.results.iter().all(|r| !r.available && r.error.is_some()));
        assert_eq!(report.recommended, None);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn a_panicking_probe_only_affects_its_url() {
        let probe = StubProbe::new()
            .with("https://primary", StubBehaviour::Panic)
            .with("https://mirror-1", StubBehaviour::unreachable(ProbeFailure::HttpStatus(404)))
            .with("https://mirror-2", StubBehaviour::reachable(80, None));

        let report = resolver(probe).resolve(&three_urls()).await;

        let primary = report.results.first().expect("primary result");
        assert!(!primary.available);
        assert!(primary.error.as_deref().is_some_and(|e| e.starts_with("check failed")));
        assert_eq!(
            report.results.get(1).and_then(|r| r.error.as_deref()),
            Some("HTTP 404")
        );
        assert_eq!(report.recommended, Some(2));
    }

    #[rstest]
    fn supervision_never_undercuts_the_probe_deadline() {
        let probe = StubProbe::new().with_deadline(Duration::from_secs(10));
        let resolver = resolver(probe);
        assert_eq!(resolver.supervision(), Duration::from_secs(10));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn running_out_of_time_keeps_finished_results() {
        let probe = StubProbe::new()
            .with("https://primary", StubBehaviour::Hang)
            .with("https://mirror-1", StubBehaviour::reachable(50, Some("4")))
            .with("https://mirror-2", StubBehaviour::Hang);

        let report = resolver(probe)
            .resolve_within(&three_urls(), Duration::from_secs(1))
            .await;

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.recommended, Some(1));
        for index in [0, 2] {
            assert_eq!(
                report.results.get(index).and_then(|r| r.error.as_deref()),
                Some("check timed out")
            );
        }
    }

    #[rstest]
    #[case(1, 3, 9)]
    #[case(2, 3, 6)]
    #[case(4, 3, 3)]
    #[case(4, 0, 3)]
    fn window_covers_every_round_of_queued_checks(
        #[case] capacity: usize,
        #[case] urls: usize,
        #[case] seconds: u64,
    ) {
        let resolver = MirrorResolver::new(
            Arc::new(StubProbe::new()),
            ProbePool::new(capacity),
            Duration::from_secs(3),
        );
        assert_eq!(resolver.window_for(urls), Duration::from_secs(seconds));
    }
}
