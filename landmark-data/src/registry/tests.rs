//! Unit tests for the source registry.

use std::fs;

use camino::Utf8PathBuf;
use landmark_core::DataSource;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

#[fixture]
fn workspace() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("config.json")).expect("utf-8 path");
    (dir, path)
}

fn write(path: &Utf8PathBuf, contents: &str) {
    fs::write(path, contents).expect("write registry fixture");
}

const LEGACY_REGISTRY: &str = r#"{
    "sources": {
        "fletime": {
            "name": "Custom FleTime",
            "url": "https://example.org/custom.json",
            "enabled": true,
            "type": "JSON"
        }
    },
    "currentSource": "fletime",
    "version": 1
}"#;

#[rstest]
fn missing_file_yields_defaults_on_disk(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    let registry = SourceRegistry::load(path.clone());

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.current_name(), DEFAULT_CURRENT_SOURCE);
    assert_eq!(snapshot.schema_version(), CURRENT_SCHEMA_VERSION);
    assert_eq!(snapshot.sources().len(), 3);
    assert!(path.is_file());
}

#[rstest]
fn save_then_load_round_trips(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    let registry = SourceRegistry::load(path.clone());
    let extra = DataSource::document(
        "extra",
        "Extra",
        None,
        vec!["https://m1.example/x.json".into(), "https://m2.example/x.json".into()],
    )
    .expect("valid source")
    .with_declared_version(Some("12".into()));
    registry.add_source(extra).expect("add source");
    registry.switch_current("extra").expect("switch to extra");
    assert!(registry.save());

    let reloaded = SourceRegistry::load(path);
    assert_eq!(*reloaded.snapshot(), *registry.snapshot());
    assert_eq!(reloaded.snapshot().current_name(), "extra");
}

#[rstest]
#[case("not json at all")]
#[case(r#"{"sources": {}, "currentSource": "x", "version": 2}"#)]
#[case(r#"{"sources": {"bad": {"name": "Bad", "type": "API"}}, "currentSource": "bad", "version": 2}"#)]
fn corrupt_file_is_backed_up_and_reset(
    workspace: (TempDir, Utf8PathBuf),
    #[case] contents: &str,
) {
    let (_dir, path) = workspace;
    write(&path, contents);

    let registry = SourceRegistry::load(path.clone());

    assert_eq!(registry.snapshot().current_name(), DEFAULT_CURRENT_SOURCE);
    let backup = Utf8PathBuf::from(format!("{path}{BACKUP_SUFFIX}"));
    let kept = fs::read_to_string(&backup).expect("backup written");
    assert_eq!(kept, contents);
    let rewritten = fs::read_to_string(&path).expect("registry rewritten");
    assert!(rewritten.contains("\"lynn-json\""));
}

#[rstest]
fn corrupt_file_survives_when_backup_cannot_be_written(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    let contents = "{ user data that is corrupt";
    write(&path, contents);
    let backup = Utf8PathBuf::from(format!("{path}{BACKUP_SUFFIX}"));
    fs::create_dir(&backup).expect("occupy backup path with a directory");

    let registry = SourceRegistry::load(path.clone());

    assert!(registry.is_read_only());
    assert_eq!(registry.snapshot().current_name(), DEFAULT_CURRENT_SOURCE);
    assert_eq!(fs::read_to_string(&path).expect("original kept"), contents);

    registry.switch_current("lynn-json").expect("switch in memory");
    assert!(!registry.save());
    assert_eq!(registry.snapshot().current_name(), "lynn-json");
    assert_eq!(fs::read_to_string(&path).expect("original kept"), contents);
}

#[rstest]
fn migration_adds_missing_builtins_without_overwriting(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    write(&path, LEGACY_REGISTRY);

    let registry = SourceRegistry::load(path.clone());

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.schema_version(), CURRENT_SCHEMA_VERSION);
    assert!(snapshot.sources().contains_key("lynn-json"));
    assert!(snapshot.sources().contains_key("lynn-api"));
    let fletime = snapshot.sources().get("fletime").expect("fletime kept");
    assert_eq!(fletime.display_name(), "Custom FleTime");
    assert_eq!(fletime.primary_url(), Some("https://example.org/custom.json"));

    let on_disk = fs::read_to_string(&path).expect("registry rewritten");
    assert!(on_disk.contains("\"version\": 2"));
}

#[rstest]
fn disabled_current_falls_back_to_first_enabled(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    write(
        &path,
        r#"{
            "sources": {
                "alpha": {"name": "Alpha", "url": "https://a.example/a.json", "enabled": false},
                "beta": {"name": "Beta", "url": "https://b.example/b.json"}
            },
            "currentSource": "alpha",
            "version": 2
        }"#,
    );

    let registry = SourceRegistry::load(path);
    assert_eq!(registry.snapshot().current_name(), "beta");
}

#[rstest]
#[case("missing", SwitchError::UnknownSource { name: "missing".into() })]
#[case("off", SwitchError::SourceDisabled { name: "off".into() })]
fn refused_switch_keeps_current(
    workspace: (TempDir, Utf8PathBuf),
    #[case] target: &str,
    #[case] expected: SwitchError,
) {
    let (_dir, path) = workspace;
    let registry = SourceRegistry::load(path);
    let disabled = DataSource::document("off", "Off", Some("https://off.example".into()), Vec::new())
        .expect("valid source")
        .with_enabled(false);
    registry.add_source(disabled).expect("add disabled source");

    assert_eq!(registry.switch_current(target), Err(expected));
    assert!(!registry.switch_source(target));
    assert_eq!(registry.snapshot().current_name(), DEFAULT_CURRENT_SOURCE);
}

#[rstest]
fn switch_persists_selection(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    let registry = SourceRegistry::load(path.clone());

    assert!(registry.switch_source("lynn-api"));

    let reloaded = SourceRegistry::load(path);
    assert_eq!(
        reloaded.current_source().map(|source| source.name().to_owned()),
        Some("lynn-api".to_owned())
    );
}

#[rstest]
fn unchanged_state_is_not_rewritten(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    let registry = SourceRegistry::load(path.clone());
    // A hand-edited file that decodes to the same state must survive untouched.
    let compact = fs::read_to_string(&path)
        .expect("read registry")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    write(&path, &compact);

    assert!(registry.save_if_changed());
    assert!(registry.switch_source(DEFAULT_CURRENT_SOURCE));

    assert_eq!(fs::read_to_string(&path).expect("read registry"), compact);
}

#[rstest]
fn duplicate_source_is_rejected(workspace: (TempDir, Utf8PathBuf)) {
    let (_dir, path) = workspace;
    let registry = SourceRegistry::load(path);
    let clash = DataSource::api("lynn-api", "Clash", "https://other.example").expect("valid");

    let err = registry.add_source(clash).expect_err("duplicate name");
    assert!(matches!(err, RegistryError::DuplicateSource { .. }));
}
