//! Status command implementation for the landmark CLI.

use camino::Utf8PathBuf;
use clap::Parser;
use landmark_core::StatusProgress;
use landmark_data::{LandmarkService, ProgressSink, SyncSettings};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::{
    ARG_CONFIG_DIR, ARG_MAX_CONCURRENT_PROBES, ARG_MIRROR_TIMEOUT_MS, ARG_PROBE_TIMEOUT_MS,
    ARG_SOURCE_TIMEOUT_MS, ARG_USER_AGENT, CliError, count_or, millis_or, runtime, write_json,
};

/// CLI arguments for the `status` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Probe every configured source concurrently. Document \
                 sources report their fastest reachable mirror; API sources \
                 report their endpoint and version. Prints a JSON summary.",
    about = "Report source reachability"
)]
#[ortho_config(prefix = "LANDMARK")]
pub(crate) struct StatusArgs {
    /// Directory holding `config.json`.
    #[arg(long = ARG_CONFIG_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) config_dir: Option<Utf8PathBuf>,
    /// Deadline for a single endpoint probe, in milliseconds.
    #[arg(long = ARG_PROBE_TIMEOUT_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) probe_timeout_ms: Option<u64>,
    /// Supervision window for each mirror check, in milliseconds.
    #[arg(long = ARG_MIRROR_TIMEOUT_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) mirror_timeout_ms: Option<u64>,
    /// Supervision window for each source, in milliseconds.
    #[arg(long = ARG_SOURCE_TIMEOUT_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) source_timeout_ms: Option<u64>,
    /// Upper bound on probes in flight.
    #[arg(long = ARG_MAX_CONCURRENT_PROBES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrent_probes: Option<usize>,
    /// User agent sent with every request.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Print one line per finished source to stderr.
    #[arg(long)]
    #[serde(default)]
    pub(crate) progress: bool,
}

impl StatusArgs {
    pub(crate) fn into_settings(self) -> Result<(SyncSettings, bool), CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        let progress = merged.progress;
        Ok((SyncSettings::try_from(merged)?, progress))
    }
}

impl TryFrom<StatusArgs> for SyncSettings {
    type Error = CliError;

    fn try_from(args: StatusArgs) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let mut settings = Self::new(args.config_dir.unwrap_or(defaults.config_dir))
            .with_probe_timeout(millis_or(
                args.probe_timeout_ms,
                ARG_PROBE_TIMEOUT_MS,
                defaults.probe_timeout,
            )?)
            .with_mirror_timeout(millis_or(
                args.mirror_timeout_ms,
                ARG_MIRROR_TIMEOUT_MS,
                defaults.mirror_timeout,
            )?)
            .with_source_timeout(millis_or(
                args.source_timeout_ms,
                ARG_SOURCE_TIMEOUT_MS,
                defaults.source_timeout,
            )?)
            .with_max_concurrent_probes(count_or(
                args.max_concurrent_probes,
                ARG_MAX_CONCURRENT_PROBES,
                defaults.max_concurrent_probes,
            )?);
        if let Some(agent) = args.user_agent {
            settings = settings.with_user_agent(agent);
        }
        Ok(settings)
    }
}

pub(crate) fn run_status(args: StatusArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let (settings, progress) = args.into_settings()?;
    let service = LandmarkService::open(&settings)?;
    if progress {
        status_with(&service, &LineProgress::new(io::stderr()), writer)
    } else {
        status_with(&service, &|_: &StatusProgress| {}, writer)
    }
}

/// Check every source and print the summary.
pub(crate) fn status_with(
    service: &LandmarkService,
    sink: &dyn ProgressSink,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let summary = runtime()?.block_on(service.check_status(sink));
    write_json(writer, &summary)
}

/// Writes one [`progress_line`] per finished source.
#[derive(Debug)]
pub(crate) struct LineProgress<W>(Mutex<W>);

impl<W: Write + Send> LineProgress<W> {
    pub(crate) const fn new(target: W) -> Self {
        Self(Mutex::new(target))
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> ProgressSink for LineProgress<W> {
    fn on_progress(&self, progress: &StatusProgress) {
        let mut target = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        // Progress is advisory; a closed stderr must not abort the pass.
        drop(writeln!(target, "{}", progress_line(progress)));
    }
}

pub(crate) fn progress_line(update: &StatusProgress) -> String {
    let state = if update.report.is_available() {
        "available"
    } else {
        "unavailable"
    };
    format!(
        "[{}/{}] {}: {state}",
        update.completed, update.total, update.report.name
    )
}

#[cfg(test)]
pub(crate) fn status_settings_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SyncSettings, CliError> {
    let merged = StatusArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SyncSettings::try_from(merged)
}
