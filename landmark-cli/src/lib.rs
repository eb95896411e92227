//! Command-line interface for the landmark source engine.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

mod error;
mod status;
mod switch;
mod sync;

pub use error::CliError;

use status::{StatusArgs, run_status};
use switch::{SwitchArgs, run_switch};
use sync::{SyncArgs, run_sync};

pub(crate) const ARG_CONFIG_DIR: &str = "config-dir";
pub(crate) const ARG_DOWNLOAD_TIMEOUT_MS: &str = "download-timeout-ms";
pub(crate) const ARG_PROBE_TIMEOUT_MS: &str = "probe-timeout-ms";
pub(crate) const ARG_MIRROR_TIMEOUT_MS: &str = "mirror-timeout-ms";
pub(crate) const ARG_SOURCE_TIMEOUT_MS: &str = "source-timeout-ms";
pub(crate) const ARG_MAX_CONCURRENT_PROBES: &str = "max-concurrent-probes";
pub(crate) const ARG_PREFIX_BYTES: &str = "prefix-bytes";
pub(crate) const ARG_USER_AGENT: &str = "user-agent";
pub(crate) const ARG_SYNC_LOG: &str = "sync-log";
pub(crate) const ARG_SWITCH_SOURCE: &str = "source";
pub(crate) const ENV_SWITCH_SOURCE: &str = "LANDMARK_CMDS_SWITCH_SOURCE";

/// Run the landmark CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, the
/// engine cannot start, a switch is refused, or output cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    match cli.command {
        Command::Sync(args) => run_sync(args, &mut writer),
        Command::Status(args) => run_status(args, &mut writer),
        Command::Switch(args) => run_switch(args, &mut writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "landmark",
    about = "Keep landmark data sources in sync and report their reachability",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh the local cache of every document source.
    Sync(SyncArgs),
    /// Probe every source and its mirrors.
    Status(StatusArgs),
    /// Select the current source.
    Switch(SwitchArgs),
}

/// Multi-threaded runtime for driving the engine's async operations.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

/// Convert an optional millisecond count, rejecting zero.
pub(crate) fn millis_or(
    value: Option<u64>,
    field: &'static str,
    default: Duration,
) -> Result<Duration, CliError> {
    match value {
        None => Ok(default),
        Some(0) => Err(CliError::ZeroValue { field }),
        Some(ms) => Ok(Duration::from_millis(ms)),
    }
}

/// Reject an explicit zero count.
pub(crate) fn count_or(
    value: Option<usize>,
    field: &'static str,
    default: usize,
) -> Result<usize, CliError> {
    match value {
        None => Ok(default),
        Some(0) => Err(CliError::ZeroValue { field }),
        Some(count) => Ok(count),
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
