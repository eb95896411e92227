//! Test helpers for building registries and services in a temporary directory.

use camino::{Utf8Path, Utf8PathBuf};
use landmark_data::test_support::{StubBehaviour, StubProbe};
use landmark_data::{LandmarkService, SyncSettings};
use std::{fs, sync::Arc};
use tempfile::TempDir;

pub(super) const PRIMARY_URL: &str = "https://alpha.test/landmarks.json";
pub(super) const MIRROR_URL: &str = "https://mirror.alpha.test/landmarks.json";
pub(super) const API_BASE_URL: &str = "https://beta.test";
pub(super) const DOCUMENT: &[u8] = br#"{"version":"7","landmarks":[]}"#;

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Temporary config directory seeded with a document and an API source.
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let registry = serde_json::json!({
            "version": 2,
            "currentSource": "alpha",
            "sources": {
                "alpha": {
                    "name": "Alpha",
                    "url": PRIMARY_URL,
                    "mirrorUrls": [MIRROR_URL]
                },
                "beta": {
                    "name": "Beta",
                    "url": "",
                    "type": "API",
                    "apiBaseUrl": API_BASE_URL
                },
                "gamma": {
                    "name": "Gamma",
                    "url": "https://gamma.test/landmarks.json",
                    "enabled": false
                }
            }
        });
        fs::write(
            root.join("config.json"),
            serde_json::to_vec_pretty(&registry).expect("encode registry"),
        )
        .expect("write registry");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn settings(&self) -> SyncSettings {
        SyncSettings::new(self.root.clone())
    }

    /// Service whose primary is down and whose mirror and API respond.
    pub(super) fn service(&self) -> LandmarkService {
        let probe = StubProbe::new()
            .with(PRIMARY_URL, StubBehaviour::unreachable(
                landmark_core::ProbeFailure::HttpStatus(503),
            ))
            .with(MIRROR_URL, StubBehaviour::reachable(10, Some("7")))
            .with_document(MIRROR_URL, DOCUMENT)
            .with(API_BASE_URL, StubBehaviour::reachable(5, Some("2")));
        LandmarkService::with_probe(&self.settings(), Arc::new(probe))
    }
}

pub(super) fn output_json(buffer: &[u8]) -> serde_json::Value {
    serde_json::from_slice(buffer).expect("command output should be JSON")
}
