//! Status checks across every configured source.
//!
//! [`StatusAggregator::check_all`] reports disabled sources straight away,
//! then resolves every enabled source concurrently and notifies a
//! [`ProgressSink`] as each one finishes. A source that panics or overruns
//! its window is reported as unavailable without disturbing the others.

use std::collections::BTreeMap;
use std::time::Duration;

use landmark_core::{
    DataSource, MirrorReport, ProbeFailure, ProbeResult, SourceMode, SourceStatusReport,
    StatusProgress, StatusSummary,
};
use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use crate::resolver::MirrorResolver;
use crate::task::catch_panic;

/// Receives one notification per finished source, in completion order.
pub trait ProgressSink: Send + Sync {
    /// Called as soon as a source's report is ready.
    fn on_progress(&self, progress: &StatusProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&StatusProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &StatusProgress) {
        self(progress);
    }
}

/// Forwards progress into a Tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub UnboundedSender<StatusProgress>);

impl ProgressSink for ChannelProgress {
    fn on_progress(&self, progress: &StatusProgress) {
        if self.0.send(progress.clone()).is_err() {
            debug!("progress receiver dropped");
        }
    }
}

/// Drives [`MirrorResolver`] over every source.
#[derive(Debug, Clone)]
pub struct StatusAggregator {
    resolver: MirrorResolver,
    source_timeout: Duration,
}

impl StatusAggregator {
    /// Create an aggregator giving each source `source_timeout` to finish.
    #[must_use]
    pub const fn new(resolver: MirrorResolver, source_timeout: Duration) -> Self {
        Self {
            resolver,
            source_timeout,
        }
    }

    /// Resolver used for document sources.
    #[must_use]
    pub const fn resolver(&self) -> &MirrorResolver {
        &self.resolver
    }

    /// Check every source and summarise the results.
    pub async fn check_all(
        &self,
        sources: &BTreeMap<String, DataSource>,
        sink: &dyn ProgressSink,
    ) -> StatusSummary {
        let total = sources.len();
        let mut reports = Vec::with_capacity(total);
        let mut emit = |report: SourceStatusReport| {
            sink.on_progress(&StatusProgress {
                completed: reports.len() + 1,
                total,
                report: report.clone(),
            });
            reports.push(report);
        };

        let mut tasks = JoinSet::new();
        let mut pending = BTreeMap::new();
        for (index, source) in sources.values().enumerate() {
            if !source.is_enabled() {
                emit(disabled_report(source));
                continue;
            }
            pending.insert(index, source.clone());
            let aggregator = self.clone();
            let source = source.clone();
            tasks.spawn(async move { (index, aggregator.supervised_check(&source).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    pending.remove(&index);
                    emit(report);
                }
                Err(err) => warn!("status task did not join: {err}"),
            }
        }
        for source in pending.into_values() {
            emit(failed_report(
                &source,
                ProbeFailure::TaskFailed("check was cancelled".to_owned()),
            ));
        }

        StatusSummary::from_reports(reports)
    }

    /// Window granted to `source`: the configured source timeout, widened
    /// so every URL gets one supervised attempt even when queued for permits.
    fn window(&self, source: &DataSource) -> Duration {
        let urls = match source.mode() {
            SourceMode::Api => 1,
            SourceMode::Document => source.all_urls().len(),
        };
        self.source_timeout.max(self.resolver.window_for(urls))
    }

    async fn supervised_check(&self, source: &DataSource) -> SourceStatusReport {
        let window = self.window(source);
        let checked = match source.mode() {
            // The resolver reports its own overruns per URL.
            SourceMode::Document => catch_panic(self.check_document(source, Some(window)))
                .await
                .map(Ok),
            SourceMode::Api => {
                catch_panic(tokio::time::timeout(window, self.check_api(source))).await
            }
        };
        match checked {
            Ok(Ok(report)) => report,
            Ok(Err(_elapsed)) => {
                debug!("status check of {:?} exceeded {window:?}", source.name());
                failed_report(source, ProbeFailure::SupervisionTimeout)
            }
            Err(message) => {
                warn!("status check of {:?} panicked: {message}", source.name());
                failed_report(source, ProbeFailure::TaskFailed(message))
            }
        }
    }

    /// Check one enabled source without supervision.
    pub async fn check_source(&self, source: &DataSource) -> SourceStatusReport {
        match source.mode() {
            SourceMode::Api => self.check_api(source).await,
            SourceMode::Document => self.check_document(source, None).await,
        }
    }

    async fn check_api(&self, source: &DataSource) -> SourceStatusReport {
        let best = match source.api_base_url() {
            Some(base) => self.resolver.probe_api(base).await,
            None => ProbeResult::unreachable("", true, ProbeFailure::NoUrl),
        };
        report(source, best, None)
    }

    async fn check_document(
        &self,
        source: &DataSource,
        window: Option<Duration>,
    ) -> SourceStatusReport {
        let mirrors = match window {
            Some(window) => self.resolver.resolve_within(source, window).await,
            None => self.resolver.resolve(source).await,
        };
        let best = mirrors.representative();
        let breakdown = (!source.mirror_urls().is_empty()).then_some(mirrors);
        report(source, best, breakdown)
    }
}

fn report(
    source: &DataSource,
    best: ProbeResult,
    mirrors: Option<MirrorReport>,
) -> SourceStatusReport {
    SourceStatusReport {
        name: source.name().to_owned(),
        mode: source.mode(),
        enabled: source.is_enabled(),
        best,
        mirrors,
    }
}

fn representative_url(source: &DataSource) -> String {
    source
        .all_urls()
        .first()
        .copied()
        .or_else(|| source.api_base_url())
        .unwrap_or_default()
        .to_owned()
}

fn failed_report(source: &DataSource, failure: ProbeFailure) -> SourceStatusReport {
    let best = ProbeResult::unreachable(representative_url(source), true, failure);
    report(source, best, None)
}

fn disabled_report(source: &DataSource) -> SourceStatusReport {
    failed_report(source, ProbeFailure::Disabled)
}
