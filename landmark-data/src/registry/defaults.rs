//! Built-in sources shipped with the engine.

use std::collections::BTreeMap;

use landmark_core::DataSource;
use log::error;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Source selected when no configuration exists.
pub const DEFAULT_CURRENT_SOURCE: &str = "fletime";

const FLETIME_URL: &str =
    "https://wiki.ria.red/wiki/%E7%94%A8%E6%88%B7:FleTime/toriifind.json?action=raw";
const LYNN_PRIMARY_URL: &str =
    "https://github.com/7N4D6Un/ToriiFind/raw/refs/heads/main/data/lynn.json";
const LYNN_MIRROR_URLS: [&str; 2] = [
    "https://raw.kkgithub.com/7N4D6Un/ToriiFind/main/data/lynn.json",
    "https://fastly.jsdelivr.net/gh/7N4D6Un/ToriiFind@main/data/lynn.json",
];
const LYNN_API_BASE_URL: &str = "https://ria-data.api.lynn6.top";

/// Build the built-in sources keyed by name.
pub(crate) fn default_sources() -> BTreeMap<String, DataSource> {
    let candidates = [
        DataSource::document(
            "fletime",
            "FleTime",
            Some(FLETIME_URL.to_owned()),
            Vec::new(),
        ),
        DataSource::document(
            "lynn-json",
            "Lynn (document)",
            Some(LYNN_PRIMARY_URL.to_owned()),
            LYNN_MIRROR_URLS.iter().map(|url| (*url).to_owned()).collect(),
        ),
        DataSource::api("lynn-api", "Lynn (API)", LYNN_API_BASE_URL),
    ];
    candidates
        .into_iter()
        .filter_map(|candidate| match candidate {
            Ok(source) => Some((source.name().to_owned(), source)),
            Err(err) => {
                error!("built-in source rejected: {err}");
                None
            }
        })
        .collect()
}
