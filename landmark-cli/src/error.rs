//! Error types emitted by the landmark CLI.

use std::sync::Arc;

use landmark_data::{ServiceError, SwitchError};
use thiserror::Error;

/// Errors emitted by the landmark CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Name of the missing option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A numeric option must be positive.
    #[error("{field} must be greater than zero")]
    ZeroValue {
        /// Name of the offending option.
        field: &'static str,
    },
    /// The Tokio runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The engine could not be assembled.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The requested source cannot be selected.
    #[error("cannot switch source: {0}")]
    Switch(#[from] SwitchError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
