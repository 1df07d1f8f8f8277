//! Monitored source definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a source produces on every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A page listing downloadable documents; every PDF URL is tracked.
    DocumentList,
    /// A page whose first row is the latest record; only its id is tracked.
    LatestRecord,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::DocumentList => f.write_str("document-list"),
            SourceKind::LatestRecord => f.write_str("single-latest-record"),
        }
    }
}

/// Built-in extraction adapters, selectable by name in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorId {
    /// Ministry notice list on the hospital association site.
    HospitalDocuments,
    /// Meeting table of the Central Social Insurance Medical Council.
    ChuikyoMeetings,
}

impl ExtractorId {
    /// The kind of source this adapter serves.
    pub fn kind(self) -> SourceKind {
        match self {
            ExtractorId::HospitalDocuments => SourceKind::DocumentList,
            ExtractorId::ChuikyoMeetings => SourceKind::LatestRecord,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractorId::HospitalDocuments => "hospital-documents",
            ExtractorId::ChuikyoMeetings => "chuikyo-meetings",
        }
    }
}

impl fmt::Display for ExtractorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping entry binding a URL to an extraction adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page URL; also the key in persisted state
    pub url: String,

    /// Adapter used to read the page
    pub extractor: ExtractorId,

    /// Human-readable name used in notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>, extractor: ExtractorId) -> Self {
        Self {
            url: url.into(),
            extractor,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, falling back to the URL.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_kinds() {
        assert_eq!(
            ExtractorId::HospitalDocuments.kind(),
            SourceKind::DocumentList
        );
        assert_eq!(ExtractorId::ChuikyoMeetings.kind(), SourceKind::LatestRecord);
    }

    #[test]
    fn test_source_config_from_toml() {
        let source: SourceConfig = toml::from_str(
            r#"
            url = "https://www.mhlw.go.jp/stf/shingi/shingi-chuo_128154.html"
            extractor = "chuikyo-meetings"
            "#,
        )
        .unwrap();
        assert_eq!(source.extractor, ExtractorId::ChuikyoMeetings);
        assert_eq!(source.display_name(), source.url);
    }
}
