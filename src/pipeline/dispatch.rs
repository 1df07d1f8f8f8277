// src/pipeline/dispatch.rs

//! Per-source check loop.
//!
//! Sources are processed one at a time. A failure on one source raises an
//! admin alert and marks that source failed; the remaining sources are
//! still checked.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{DocumentItem, Notification};
use crate::notify::Notifier;
use crate::pipeline::reconcile::{DocumentOutcome, Reconciler};
use crate::services::{MonitoredSource, Strategy};
use crate::storage::StateStore;
use crate::utils::http::PageFetcher;

/// What happened to one source during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// New items were found and delivered.
    Notified { count: usize },
    /// Nothing new since the last run.
    NoChange,
    /// First check of a document-list source; URLs recorded silently.
    FirstObservation { recorded: usize },
    /// The page had no qualifying latest record.
    NoRecord,
    /// The source could not be checked or its notification was not delivered.
    Failed { reason: String },
}

impl SourceStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, SourceStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub url: String,
    pub name: String,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Aggregate result of one check cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<SourceOutcome>,
}

impl RunReport {
    /// True when every source succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| !o.status.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }

    /// Total items notified across sources.
    pub fn notified_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                SourceStatus::Notified { count } => count,
                _ => 0,
            })
            .sum()
    }

    /// Status code for HTTP-triggered runs.
    pub fn http_status(&self) -> u16 {
        if self.is_success() { 200 } else { 500 }
    }

    /// One line per failed source.
    pub fn failure_summary(&self) -> String {
        self.failures()
            .map(|o| match &o.status {
                SourceStatus::Failed { reason } => format!("{}: {}", o.url, reason),
                _ => o.url.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Alert text plus the error that caused a source to fail.
struct SourceFailure {
    alert: String,
    error: AppError,
}

impl SourceFailure {
    fn new(alert: impl Into<String>) -> impl FnOnce(AppError) -> Self {
        let alert = alert.into();
        move |error| Self { alert, error }
    }
}

/// Runs fetch, extract, reconcile and notify for each source.
pub struct Dispatcher {
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    reconciler: Reconciler,
}

impl Dispatcher {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        store: StateStore,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            reconciler: Reconciler::new(store),
        }
    }

    /// Check every source in order and report per-source outcomes.
    pub async fn run(&mut self, sources: &[MonitoredSource]) -> RunReport {
        let started_at = Utc::now();
        log::info!("Checking {} source(s)", sources.len());

        let mut outcomes = Vec::with_capacity(sources.len());
        for source in sources {
            log::info!("Checking {} ({})", source.name, source.url);

            let status = match self.check_source(source).await {
                Ok(status) => status,
                Err(failure) => {
                    log::error!("{}: {}", failure.alert, failure.error);
                    self.alert(&failure.alert, &failure.error).await;
                    SourceStatus::Failed {
                        reason: failure.error.to_string(),
                    }
                }
            };

            outcomes.push(SourceOutcome {
                url: source.url.clone(),
                name: source.name.clone(),
                status,
            });
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        if report.is_success() {
            log::info!(
                "Run finished: {} source(s), {} item(s) notified",
                report.outcomes.len(),
                report.notified_count()
            );
        } else {
            log::error!(
                "Run finished with failures:\n{}",
                report.failure_summary()
            );
        }
        report
    }

    async fn check_source(
        &mut self,
        source: &MonitoredSource,
    ) -> std::result::Result<SourceStatus, SourceFailure> {
        let url = source.url.as_str();
        let html = self
            .fetcher
            .fetch(url)
            .await
            .map_err(SourceFailure::new(format!("HTML fetch failed: {}", url)))?;

        let notification = match &source.strategy {
            Strategy::Documents(extractor) => {
                let items = extractor
                    .extract(&html, url)
                    .map_err(SourceFailure::new(format!("Extractor error for {}", url)))?;

                let outcome = self
                    .reconciler
                    .documents(url, &items)
                    .await
                    .map_err(SourceFailure::new(format!("State store unavailable for {}", url)))?;

                match outcome {
                    DocumentOutcome::FirstObservation { recorded } => {
                        return Ok(SourceStatus::FirstObservation { recorded });
                    }
                    DocumentOutcome::Unchanged => return Ok(SourceStatus::NoChange),
                    DocumentOutcome::NewItems(_) => {}
                }

                Notification::Documents {
                    documents: new_items_in_page_order(items, &outcome),
                    source: url.to_string(),
                }
            }
            Strategy::LatestRecord(extractor) => {
                let record = extractor
                    .extract(&html, url)
                    .map_err(SourceFailure::new(format!("Extractor error for {}", url)))?;

                let Some(record) = record else {
                    log::info!("No record found on {}", url);
                    return Ok(SourceStatus::NoRecord);
                };

                let is_new = self
                    .reconciler
                    .latest_record(url, &record)
                    .await
                    .map_err(SourceFailure::new(format!("State store unavailable for {}", url)))?;
                if !is_new {
                    return Ok(SourceStatus::NoChange);
                }

                Notification::Meeting {
                    record,
                    source: url.to_string(),
                }
            }
        };

        let count = notification.item_count();
        self.notifier
            .notify(&notification)
            .await
            .map_err(SourceFailure::new(format!(
                "Notification delivery failed for {}",
                url
            )))?;

        Ok(SourceStatus::Notified { count })
    }

    /// Send an admin alert; delivery failures are only logged.
    async fn alert(&self, message: &str, error: &AppError) {
        if let Err(e) = self.notifier.alert_admin(message, Some(error)).await {
            log::error!("Failed to deliver admin alert '{}': {}", message, e);
        }
    }
}

fn new_items_in_page_order(items: Vec<DocumentItem>, outcome: &DocumentOutcome) -> Vec<DocumentItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| outcome.is_new(&item.url) && seen.insert(item.url.clone()))
        .collect()
}
