//! Command output against a stubbed engine.

use super::helpers::{MIRROR_URL, Workspace, output_json};
use super::*;
use crate::status::{LineProgress, progress_line, status_with};
use crate::switch::switch_with;
use crate::sync::sync_with;
use landmark_core::{ProbeResult, SourceMode, SourceStatusReport, StatusProgress};
use landmark_data::{SourceRegistry, SwitchError};
use rstest::rstest;

#[rstest]
fn sync_prints_one_report_per_source() {
    let workspace = Workspace::new();
    let service = workspace.service();
    let mut buffer = Vec::new();

    sync_with(&service, &mut buffer).expect("sync succeeds");

    let output = output_json(&buffer);
    let reports = output.as_array().expect("array of reports");
    assert_eq!(reports.len(), 3);
    let alpha = reports
        .iter()
        .find(|report| report["source"] == "alpha")
        .expect("alpha report");
    assert_eq!(alpha["outcome"]["status"], "created");
    assert_eq!(alpha["outcome"]["url"], MIRROR_URL);
    assert!(service.local_cache_path("alpha").is_some());
    let beta = reports
        .iter()
        .find(|report| report["source"] == "beta")
        .expect("beta report");
    assert_eq!(beta["outcome"]["status"], "skipped");
}

#[rstest]
fn status_prints_summary() {
    let workspace = Workspace::new();
    let service = workspace.service();
    let mut buffer = Vec::new();

    status_with(&service, &|_: &StatusProgress| {}, &mut buffer).expect("status succeeds");

    let output = output_json(&buffer);
    assert_eq!(output["total"], 3);
    assert_eq!(output["available"], 2);
    assert_eq!(output["reports"][0]["name"], "alpha");
    assert_eq!(output["reports"][0]["best"]["url"], MIRROR_URL);
    assert_eq!(output["reports"][1]["mode"], "api");
    assert_eq!(output["reports"][2]["enabled"], false);
}

#[rstest]
fn switch_prints_new_current_source() {
    let workspace = Workspace::new();
    let registry = SourceRegistry::load(workspace.settings().registry_path());
    let mut buffer = Vec::new();

    switch_with(&registry, "beta", &mut buffer).expect("switch succeeds");

    let output = output_json(&buffer);
    assert_eq!(output["current"], "beta");
    assert_eq!(output["displayName"], "Beta");
    let reloaded = SourceRegistry::load(workspace.root().join("config.json"));
    assert_eq!(reloaded.snapshot().current_name(), "beta");
}

#[rstest]
#[case("missing", SwitchError::UnknownSource { name: "missing".to_owned() })]
#[case("gamma", SwitchError::SourceDisabled { name: "gamma".to_owned() })]
fn switch_refusal_is_reported(#[case] name: &str, #[case] expected: SwitchError) {
    let workspace = Workspace::new();
    let registry = SourceRegistry::load(workspace.settings().registry_path());
    let mut buffer = Vec::new();

    match switch_with(&registry, name, &mut buffer) {
        Err(CliError::Switch(err)) => assert_eq!(err, expected),
        other => panic!("expected CliError::Switch, found {other:?}"),
    }
    assert!(buffer.is_empty());
    assert_eq!(registry.snapshot().current_name(), "alpha");
}

#[rstest]
fn progress_line_names_source_and_state() {
    let update = StatusProgress {
        completed: 2,
        total: 5,
        report: SourceStatusReport {
            name: "alpha".to_owned(),
            mode: SourceMode::Document,
            enabled: true,
            best: ProbeResult::reachable("https://alpha.test", true, 12, None),
            mirrors: None,
        },
    };
    assert_eq!(progress_line(&update), "[2/5] alpha: available");
}

#[rstest]
fn progress_lines_are_written_as_sources_finish() {
    let workspace = Workspace::new();
    let service = workspace.service();
    let progress = LineProgress::new(Vec::new());
    let mut buffer = Vec::new();

    status_with(&service, &progress, &mut buffer).expect("status succeeds");

    let written = String::from_utf8(progress.into_inner()).expect("utf-8 progress");
    let lines: Vec<_> = written.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().any(|line| *line == "[1/3] gamma: unavailable"));
    assert!(lines.iter().any(|line| line.ends_with("alpha: available")));
    assert!(lines.iter().any(|line| line.ends_with("beta: available")));
}
