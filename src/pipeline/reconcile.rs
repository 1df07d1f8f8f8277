//! Change detection against persisted state.
//!
//! Document-list sources track every URL ever seen; the first time a source
//! is reconciled its current URLs are recorded silently so that an existing
//! backlog does not flood the channel. Latest-record sources track a single
//! id, and the first id ever seen is reported as new.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::{DocumentItem, LatestRecord};
use crate::storage::{KnownUrls, LatestIds, StateStore};

/// Result of reconciling one document-list source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Source seen for the first time; its URLs were recorded, not reported.
    FirstObservation { recorded: usize },
    /// URLs not seen before on this source.
    NewItems(BTreeSet<String>),
    /// Nothing new; state untouched.
    Unchanged,
}

impl DocumentOutcome {
    pub fn is_new(&self, url: &str) -> bool {
        match self {
            DocumentOutcome::NewItems(urls) => urls.contains(url),
            _ => false,
        }
    }

    pub fn new_count(&self) -> usize {
        match self {
            DocumentOutcome::NewItems(urls) => urls.len(),
            _ => 0,
        }
    }

    /// Whether the in-memory state was mutated and needs persisting.
    pub fn state_changed(&self) -> bool {
        !matches!(self, DocumentOutcome::Unchanged)
    }
}

/// Diff the URLs currently on a page against the known set for its source.
pub fn reconcile_documents(
    source_url: &str,
    current_urls: &BTreeSet<String>,
    known: &mut KnownUrls,
) -> DocumentOutcome {
    let Some(seen) = known.get_mut(source_url) else {
        if current_urls.is_empty() {
            return DocumentOutcome::Unchanged;
        }
        known.insert(source_url.to_string(), current_urls.clone());
        return DocumentOutcome::FirstObservation {
            recorded: current_urls.len(),
        };
    };

    let new_urls: BTreeSet<String> = current_urls.difference(seen).cloned().collect();
    if new_urls.is_empty() {
        return DocumentOutcome::Unchanged;
    }

    seen.extend(new_urls.iter().cloned());
    DocumentOutcome::NewItems(new_urls)
}

/// Compare an observed record id with the last one stored for its source.
///
/// Returns `true` and overwrites the stored id when they differ, including
/// when nothing was stored yet.
pub fn reconcile_latest_record(
    source_url: &str,
    observed_id: &str,
    latest: &mut LatestIds,
) -> bool {
    if latest.get(source_url).map(String::as_str) == Some(observed_id) {
        return false;
    }
    latest.insert(source_url.to_string(), observed_id.to_string());
    true
}

/// Runs reconciliation for one check cycle.
///
/// Each state map is loaded on first use and kept for the rest of the run.
/// A failed load is not cached, so the next source of that kind retries it.
pub struct Reconciler {
    store: StateStore,
    known_urls: Option<KnownUrls>,
    latest_ids: Option<LatestIds>,
}

impl Reconciler {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            known_urls: None,
            latest_ids: None,
        }
    }

    /// Reconcile a document-list source and persist the map if it changed.
    pub async fn documents(
        &mut self,
        source_url: &str,
        items: &[DocumentItem],
    ) -> Result<DocumentOutcome> {
        let known = match self.known_urls.take() {
            Some(known) => known,
            None => self.store.load_known_urls().await?,
        };
        let known = self.known_urls.insert(known);

        let current: BTreeSet<String> = items.iter().map(|item| item.url.clone()).collect();
        let outcome = reconcile_documents(source_url, &current, known);

        match &outcome {
            DocumentOutcome::FirstObservation { recorded } => log::info!(
                "First observation of {}: recorded {} URL(s) without notifying",
                source_url,
                recorded
            ),
            DocumentOutcome::NewItems(urls) => {
                log::info!("{} new URL(s) on {}", urls.len(), source_url)
            }
            DocumentOutcome::Unchanged => log::info!("No new documents on {}", source_url),
        }

        if outcome.state_changed() {
            self.store.save_known_urls(known).await;
        }
        Ok(outcome)
    }

    /// Reconcile a latest-record source; `true` when the record is new.
    pub async fn latest_record(&mut self, source_url: &str, record: &LatestRecord) -> Result<bool> {
        let latest = match self.latest_ids.take() {
            Some(latest) => latest,
            None => self.store.load_latest_ids().await?,
        };
        let latest = self.latest_ids.insert(latest);

        let previous = latest.get(source_url).cloned();
        let is_new = reconcile_latest_record(source_url, &record.id, latest);

        if is_new {
            log::info!(
                "New record on {}: {} (previous: {})",
                source_url,
                record.id,
                previous.as_deref().unwrap_or("none")
            );
            self.store.save_latest_ids(latest).await;
        } else {
            log::info!("Latest record on {} is unchanged ({})", source_url, record.id);
        }
        Ok(is_new)
    }
}
