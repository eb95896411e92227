//! Configured origins of landmark data.

use std::fmt;

use thiserror::Error;

/// How a source distributes its landmark records.
///
/// # Examples
/// ```
/// use landmark_core::SourceMode;
///
/// assert_eq!(SourceMode::Document.to_string(), "document");
/// assert!(SourceMode::Api.is_api());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SourceMode {
    /// One fetchable document holding every record; cached locally.
    Document,
    /// Queried live on each use; never cached.
    Api,
}

impl SourceMode {
    /// Return `true` for [`SourceMode::Api`].
    #[must_use]
    pub const fn is_api(self) -> bool {
        matches!(self, Self::Api)
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("document"),
            Self::Api => f.write_str("api"),
        }
    }
}

/// Errors returned when a [`DataSource`] violates its invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataSourceError {
    /// The identifier is empty or cannot name a cache file.
    #[error("source name {name:?} must be non-empty and use only ASCII letters, digits, '-', '_' or '.'")]
    InvalidName {
        /// Offending identifier.
        name: String,
    },
    /// A document source had neither a primary URL nor mirrors.
    #[error("document source {name:?} needs a primary URL or at least one mirror")]
    NoUrls {
        /// Identifier of the source.
        name: String,
    },
    /// An API source had no base URL.
    #[error("API source {name:?} needs an API base URL")]
    MissingApiBaseUrl {
        /// Identifier of the source.
        name: String,
    },
    /// An API source listed mirrors.
    #[error("API source {name:?} cannot declare mirror URLs")]
    ApiWithMirrors {
        /// Identifier of the source.
        name: String,
    },
}

/// A configured origin of landmark data.
///
/// Document sources are fetched as a whole and may list mirrors serving the
/// same content; API sources are reached through `api_base_url` alone.
///
/// # Examples
/// ```
/// use landmark_core::DataSource;
///
/// # fn main() -> Result<(), landmark_core::DataSourceError> {
/// let source = DataSource::document(
///     "lynn-json",
///     "Lynn (document)",
///     Some("https://primary.example/lynn.json".into()),
///     vec!["https://mirror.example/lynn.json".into()],
/// )?;
/// assert_eq!(
///     source.all_urls(),
///     vec!["https://primary.example/lynn.json", "https://mirror.example/lynn.json"],
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    name: String,
    display_name: String,
    mode: SourceMode,
    primary_url: Option<String>,
    mirror_urls: Vec<String>,
    api_base_url: Option<String>,
    enabled: bool,
    declared_version: Option<String>,
}

impl DataSource {
    /// Construct an enabled document source.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError`] when the name is invalid or no URL is
    /// usable.
    pub fn document(
        name: impl Into<String>,
        display_name: impl Into<String>,
        primary_url: Option<String>,
        mirror_urls: Vec<String>,
    ) -> Result<Self, DataSourceError> {
        let source = Self {
            name: name.into(),
            display_name: display_name.into(),
            mode: SourceMode::Document,
            primary_url,
            mirror_urls,
            api_base_url: None,
            enabled: true,
            declared_version: None,
        };
        source.validate()?;
        Ok(source)
    }

    /// Construct an enabled API source.
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError`] when the name is invalid or the base URL
    /// is blank.
    pub fn api(
        name: impl Into<String>,
        display_name: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Result<Self, DataSourceError> {
        let source = Self {
            name: name.into(),
            display_name: display_name.into(),
            mode: SourceMode::Api,
            primary_url: None,
            mirror_urls: Vec::new(),
            api_base_url: Some(api_base_url.into()),
            enabled: true,
            declared_version: None,
        };
        source.validate()?;
        Ok(source)
    }

    /// Toggle whether the source may be selected and probed.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Record the version the source advertises in its configuration.
    #[must_use]
    pub fn with_declared_version(mut self, version: Option<String>) -> Self {
        self.declared_version = version;
        self
    }

    /// Re-check the invariants, e.g. after deserialisation.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), DataSourceError> {
        if !is_valid_name(&self.name) {
            return Err(DataSourceError::InvalidName {
                name: self.name.clone(),
            });
        }
        match self.mode {
            SourceMode::Api => {
                if self.api_base_url.as_deref().is_none_or(is_blank) {
                    return Err(DataSourceError::MissingApiBaseUrl {
                        name: self.name.clone(),
                    });
                }
                if !self.mirror_urls.is_empty() {
                    return Err(DataSourceError::ApiWithMirrors {
                        name: self.name.clone(),
                    });
                }
            }
            SourceMode::Document => {
                if self.all_urls().is_empty() {
                    return Err(DataSourceError::NoUrls {
                        name: self.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every usable URL: the primary first, then mirrors in configured order.
    ///
    /// Blank entries are skipped. Index `0` is the one downstream consumers
    /// tag as primary.
    #[must_use]
    pub fn all_urls(&self) -> Vec<&str> {
        self.primary_url
            .as_deref()
            .into_iter()
            .chain(self.mirror_urls.iter().map(String::as_str))
            .filter(|url| !is_blank(url))
            .collect()
    }

    /// Unique identifier; also names the cache file.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Distribution mode.
    #[must_use]
    pub const fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Return `true` for API sources.
    #[must_use]
    pub const fn is_api_mode(&self) -> bool {
        self.mode.is_api()
    }

    /// Primary document URL, if configured.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.primary_url.as_deref()
    }

    /// Mirror URLs in configured order.
    #[must_use]
    pub fn mirror_urls(&self) -> &[String] {
        &self.mirror_urls
    }

    /// Base URL for API sources.
    #[must_use]
    pub fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    /// Whether the source may be selected and probed.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Version advertised in configuration, if any.
    #[must_use]
    pub fn declared_version(&self) -> Option<&str> {
        self.declared_version.as_deref()
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn document(primary: Option<&str>, mirrors: &[&str]) -> Result<DataSource, DataSourceError> {
        DataSource::document(
            "lynn-json",
            "Lynn",
            primary.map(str::to_owned),
            mirrors.iter().map(|url| (*url).to_owned()).collect(),
        )
    }

    #[rstest]
    fn all_urls_puts_primary_first() {
        let source = document(Some("https://a"), &["https://b", "https://c"]).expect("valid");
        assert_eq!(source.all_urls(), vec!["https://a", "https://b", "https://c"]);
    }

    #[rstest]
    fn all_urls_skips_missing_primary_and_blank_mirrors() {
        let source = document(None, &["https://b", "  ", "https://c"]).expect("valid");
        assert_eq!(source.all_urls(), vec!["https://b", "https://c"]);
    }

    #[rstest]
    #[case(None, &[])]
    #[case(Some(""), &[" "])]
    fn document_requires_a_url(#[case] primary: Option<&str>, #[case] mirrors: &[&str]) {
        let err = document(primary, mirrors).expect_err("no usable URL");
        assert!(matches!(err, DataSourceError::NoUrls { .. }));
    }

    #[rstest]
    fn api_requires_base_url() {
        let err = DataSource::api("lynn-api", "Lynn API", "   ").expect_err("blank base");
        assert!(matches!(err, DataSourceError::MissingApiBaseUrl { .. }));
    }

    #[rstest]
    fn api_sources_have_no_urls_to_mirror() {
        let source = DataSource::api("lynn-api", "Lynn API", "https://api.example").expect("valid");
        assert!(source.is_api_mode());
        assert!(source.all_urls().is_empty());
        assert_eq!(source.api_base_url(), Some("https://api.example"));
    }

    #[rstest]
    #[case("")]
    #[case(".hidden")]
    #[case("../escape")]
    #[case("with space")]
    fn rejects_names_unfit_for_cache_files(#[case] name: &str) {
        let err = DataSource::document(name, "x", Some("https://a".into()), Vec::new())
            .expect_err("invalid name");
        assert!(matches!(err, DataSourceError::InvalidName { .. }));
    }

    #[rstest]
    fn builders_set_flags() {
        let source = document(Some("https://a"), &[])
            .expect("valid")
            .with_enabled(false)
            .with_declared_version(Some("7".into()));
        assert!(!source.is_enabled());
        assert_eq!(source.declared_version(), Some("7"));
    }
}
