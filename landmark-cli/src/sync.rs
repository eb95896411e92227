//! Sync command implementation for the landmark CLI.

use camino::Utf8PathBuf;
use clap::Parser;
use landmark_data::{LandmarkService, SyncSettings};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::{
    ARG_CONFIG_DIR, ARG_DOWNLOAD_TIMEOUT_MS, ARG_MAX_CONCURRENT_PROBES, ARG_PREFIX_BYTES,
    ARG_SYNC_LOG, ARG_USER_AGENT, CliError, count_or, millis_or, runtime, write_json,
};

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Download every enabled document source whose remote version \
                 differs from the cached copy. API sources are never cached. \
                 Prints one JSON report per source.",
    about = "Refresh cached documents"
)]
#[ortho_config(prefix = "LANDMARK")]
pub(crate) struct SyncArgs {
    /// Directory holding `config.json` and the document cache.
    #[arg(long = ARG_CONFIG_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) config_dir: Option<Utf8PathBuf>,
    /// Deadline for downloading one document, in milliseconds.
    #[arg(long = ARG_DOWNLOAD_TIMEOUT_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) download_timeout_ms: Option<u64>,
    /// Upper bound on concurrent version reads.
    #[arg(long = ARG_MAX_CONCURRENT_PROBES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrent_probes: Option<usize>,
    /// Bytes read from a document's start when looking for its version.
    #[arg(long = ARG_PREFIX_BYTES, value_name = "bytes")]
    #[serde(default)]
    pub(crate) prefix_bytes: Option<usize>,
    /// User agent sent with every request.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// SQLite file recording every cache write.
    #[arg(long = ARG_SYNC_LOG, value_name = "path")]
    #[serde(default)]
    pub(crate) sync_log: Option<Utf8PathBuf>,
}

impl SyncArgs {
    pub(crate) fn into_settings(self) -> Result<SyncSettings, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncSettings::try_from(merged)
    }
}

impl TryFrom<SyncArgs> for SyncSettings {
    type Error = CliError;

    fn try_from(args: SyncArgs) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let mut settings = Self::new(args.config_dir.unwrap_or(defaults.config_dir))
            .with_download_timeout(millis_or(
                args.download_timeout_ms,
                ARG_DOWNLOAD_TIMEOUT_MS,
                defaults.download_timeout,
            )?)
            .with_max_concurrent_probes(count_or(
                args.max_concurrent_probes,
                ARG_MAX_CONCURRENT_PROBES,
                defaults.max_concurrent_probes,
            )?)
            .with_prefix_bytes(count_or(
                args.prefix_bytes,
                ARG_PREFIX_BYTES,
                defaults.prefix_bytes,
            )?);
        if let Some(agent) = args.user_agent {
            settings = settings.with_user_agent(agent);
        }
        if let Some(path) = args.sync_log {
            settings = settings.with_sync_log(path);
        }
        Ok(settings)
    }
}

pub(crate) fn run_sync(args: SyncArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let settings = args.into_settings()?;
    let service = LandmarkService::open(&settings)?;
    sync_with(&service, writer)
}

/// Run a full sync pass and print the per-source reports.
pub(crate) fn sync_with(service: &LandmarkService, writer: &mut dyn Write) -> Result<(), CliError> {
    let reports = runtime()?.block_on(service.startup_sync());
    write_json(writer, &reports)
}

#[cfg(test)]
pub(crate) fn sync_settings_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SyncSettings, CliError> {
    let merged = SyncArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SyncSettings::try_from(merged)
}
