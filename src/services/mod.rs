//! Page extraction adapters.
//!
//! Each monitored source is bound at startup to one strategy:
//! a [`DocumentExtractor`] for document-list pages or a
//! [`RecordExtractor`] for pages whose first row is the latest record.

mod documents;
mod meetings;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, DocumentItem, ExtractorId, LatestRecord, SourceConfig, SourceKind};

pub use documents::DocumentListExtractor;
pub use meetings::MeetingTableExtractor;

/// Turns a document-list page into its items, in page order.
pub trait DocumentExtractor: Send + Sync {
    /// Extract document items; malformed rows are skipped, not errors.
    fn extract(&self, html: &str, base_url: &str) -> Result<Vec<DocumentItem>>;
}

/// Finds the latest record on a single-latest-record page.
pub trait RecordExtractor: Send + Sync {
    /// `Ok(None)` when the page has no qualifying row.
    fn extract(&self, html: &str, base_url: &str) -> Result<Option<LatestRecord>>;
}

/// Extraction strategy resolved for a source.
#[derive(Clone)]
pub enum Strategy {
    Documents(Arc<dyn DocumentExtractor>),
    LatestRecord(Arc<dyn RecordExtractor>),
}

impl Strategy {
    pub fn kind(&self) -> SourceKind {
        match self {
            Strategy::Documents(_) => SourceKind::DocumentList,
            Strategy::LatestRecord(_) => SourceKind::LatestRecord,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy({})", self.kind())
    }
}

/// A configured source bound to its extraction strategy.
#[derive(Debug, Clone)]
pub struct MonitoredSource {
    pub url: String,
    pub name: String,
    pub strategy: Strategy,
}

impl MonitoredSource {
    pub fn kind(&self) -> SourceKind {
        self.strategy.kind()
    }
}

/// Lookup table from adapter id to extractor implementation.
#[derive(Default)]
pub struct ExtractorRegistry {
    documents: HashMap<ExtractorId, Arc<dyn DocumentExtractor>>,
    records: HashMap<ExtractorId, Arc<dyn RecordExtractor>>,
}

impl ExtractorRegistry {
    /// Registry with the built-in site adapters.
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register_documents(
            ExtractorId::HospitalDocuments,
            Arc::new(DocumentListExtractor::default()),
        );
        registry.register_records(
            ExtractorId::ChuikyoMeetings,
            Arc::new(MeetingTableExtractor::default()),
        );
        registry
    }

    pub fn register_documents(&mut self, id: ExtractorId, extractor: Arc<dyn DocumentExtractor>) {
        self.records.remove(&id);
        self.documents.insert(id, extractor);
    }

    pub fn register_records(&mut self, id: ExtractorId, extractor: Arc<dyn RecordExtractor>) {
        self.documents.remove(&id);
        self.records.insert(id, extractor);
    }

    /// Strategy registered for an adapter id.
    pub fn strategy(&self, id: ExtractorId) -> Option<Strategy> {
        if let Some(extractor) = self.documents.get(&id) {
            return Some(Strategy::Documents(Arc::clone(extractor)));
        }
        self.records
            .get(&id)
            .map(|extractor| Strategy::LatestRecord(Arc::clone(extractor)))
    }

    /// Bind sources to strategies; sources without an adapter are skipped.
    pub fn resolve(&self, sources: &[SourceConfig]) -> Vec<MonitoredSource> {
        sources
            .iter()
            .filter_map(|source| match self.strategy(source.extractor) {
                Some(strategy) => Some(MonitoredSource {
                    url: source.url.clone(),
                    name: source.display_name().to_string(),
                    strategy,
                }),
                None => {
                    log::warn!(
                        "No extractor registered as '{}' for {}; ignoring it",
                        source.extractor,
                        source.url
                    );
                    None
                }
            })
            .collect()
    }
}

/// Resolve the configured targets against the built-in adapters.
pub fn resolve_sources(config: &Config) -> Vec<MonitoredSource> {
    ExtractorRegistry::with_builtin().resolve(&config.resolved_sources())
}
