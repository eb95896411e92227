//! On-disk JSON representation of the registry.

use std::collections::BTreeMap;

use camino::Utf8Path;
use landmark_core::{DataSource, DataSourceError, SourceMode};
use serde::{Deserialize, Serialize};

use super::{RegistryError, RegistrySnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum RecordKind {
    #[default]
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "API")]
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(rename = "type", default)]
    kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mirror_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

const fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFile {
    #[serde(default)]
    sources: BTreeMap<String, SourceRecord>,
    #[serde(default)]
    current_source: String,
    #[serde(default = "legacy_schema_version")]
    version: u32,
}

const fn legacy_schema_version() -> u32 {
    1
}

impl SourceRecord {
    fn from_source(source: &DataSource) -> Self {
        Self {
            name: source.display_name().to_owned(),
            url: source.primary_url().map(str::to_owned),
            enabled: source.is_enabled(),
            kind: match source.mode() {
                SourceMode::Document => RecordKind::Json,
                SourceMode::Api => RecordKind::Api,
            },
            api_base_url: source.api_base_url().map(str::to_owned),
            mirror_urls: source.mirror_urls().to_vec(),
            version: source.declared_version().map(str::to_owned),
        }
    }

    fn into_source(self, key: &str) -> Result<DataSource, RegistryError> {
        let built = match self.kind {
            RecordKind::Json => DataSource::document(key, self.name, self.url, self.mirror_urls),
            RecordKind::Api if !self.mirror_urls.is_empty() => {
                return Err(RegistryError::InvalidSource {
                    name: key.to_owned(),
                    source: DataSourceError::ApiWithMirrors {
                        name: key.to_owned(),
                    },
                });
            }
            RecordKind::Api => {
                DataSource::api(key, self.name, self.api_base_url.unwrap_or_default())
            }
        };
        built
            .map(|source| {
                source
                    .with_enabled(self.enabled)
                    .with_declared_version(self.version)
            })
            .map_err(|source| RegistryError::InvalidSource {
                name: key.to_owned(),
                source,
            })
    }
}

/// Read the registry at `path`.
///
/// Returns `Ok(None)` when no file exists. The returned snapshot has not yet
/// had its current source checked.
pub(super) fn read(path: &Utf8Path) -> Result<Option<RegistrySnapshot>, RegistryError> {
    let exists = landmark_fs::file_is_file(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !exists {
        return Ok(None);
    }
    let bytes = landmark_fs::read_file(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(path, &bytes).map(Some)
}

/// Decode registry bytes read from `path`.
pub(super) fn decode(path: &Utf8Path, bytes: &[u8]) -> Result<RegistrySnapshot, RegistryError> {
    let file: RegistryFile = serde_json::from_slice(bytes).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if file.sources.is_empty() {
        return Err(RegistryError::Empty {
            path: path.to_path_buf(),
        });
    }
    let sources = file
        .sources
        .into_iter()
        .map(|(key, record)| record.into_source(&key).map(|source| (key, source)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(RegistrySnapshot {
        sources,
        current: file.current_source,
        schema_version: file.version,
    })
}

/// Serialise `snapshot` as pretty-printed JSON.
pub(super) fn encode(snapshot: &RegistrySnapshot) -> Result<Vec<u8>, RegistryError> {
    let file = RegistryFile {
        sources: snapshot
            .sources
            .iter()
            .map(|(key, source)| (key.clone(), SourceRecord::from_source(source)))
            .collect(),
        current_source: snapshot.current.clone(),
        version: snapshot.schema_version,
    };
    serde_json::to_vec_pretty(&file).map_err(|source| RegistryError::Encode { source })
}

/// Atomically replace the registry file at `path` with `snapshot`.
pub(super) fn write(path: &Utf8Path, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
    let bytes = encode(snapshot)?;
    landmark_fs::replace_file(path, &bytes).map_err(|source| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    })
}
