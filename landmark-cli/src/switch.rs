//! Switch command implementation for the landmark CLI.

use camino::Utf8PathBuf;
use clap::Parser;
use landmark_data::{SourceRegistry, SyncSettings};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::{ARG_CONFIG_DIR, ARG_SWITCH_SOURCE, CliError, ENV_SWITCH_SOURCE, write_json};

/// CLI arguments for the `switch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Make the named source current and persist the choice. \
                 Unknown or disabled sources are refused and the current \
                 selection is left unchanged.",
    about = "Select the current source"
)]
#[ortho_config(prefix = "LANDMARK")]
pub(crate) struct SwitchArgs {
    /// Name of the source to select.
    #[arg(value_name = "name")]
    #[serde(default)]
    pub(crate) source: Option<String>,
    /// Directory holding `config.json`.
    #[arg(long = ARG_CONFIG_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) config_dir: Option<Utf8PathBuf>,
}

impl SwitchArgs {
    pub(crate) fn into_config(self) -> Result<SwitchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SwitchConfig::try_from(merged)
    }
}

/// Resolved `switch` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SwitchConfig {
    pub(crate) source: String,
    pub(crate) settings: SyncSettings,
}

impl TryFrom<SwitchArgs> for SwitchConfig {
    type Error = CliError;

    fn try_from(args: SwitchArgs) -> Result<Self, Self::Error> {
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_SWITCH_SOURCE,
            env: ENV_SWITCH_SOURCE,
        })?;
        let settings = args
            .config_dir
            .map_or_else(SyncSettings::default, SyncSettings::new);
        Ok(Self { source, settings })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchResponse<'a> {
    current: &'a str,
    display_name: &'a str,
}

pub(crate) fn run_switch(args: SwitchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let registry = SourceRegistry::load(config.settings.registry_path());
    switch_with(&registry, &config.source, writer)
}

/// Select `name` and print the new current source.
pub(crate) fn switch_with(
    registry: &SourceRegistry,
    name: &str,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    registry.switch_current(name)?;
    let snapshot = registry.snapshot();
    let display_name = snapshot
        .current_source()
        .map_or(name, |source| source.display_name());
    write_json(
        writer,
        &SwitchResponse {
            current: snapshot.current_name(),
            display_name,
        },
    )
}
