//! Core domain types for landmark data synchronisation.
//!
//! These models describe where landmark data comes from ([`DataSource`]),
//! what a single reachability check observed ([`ProbeResult`]), and how the
//! observations for a source are reduced into a recommendation
//! ([`MirrorReport`], [`SourceStatusReport`], [`StatusSummary`]).
//!
//! The crate performs no I/O. Constructors validate their input and return
//! `Result` so invalid configurations surface before any network access.
#![forbid(unsafe_code)]

mod probe;
mod source;
mod status;

pub use probe::{ProbeFailure, ProbeResult};
pub use source::{DataSource, DataSourceError, SourceMode};
pub use status::{MirrorReport, SourceStatusReport, StatusProgress, StatusSummary, recommend};
