//! Check pipeline: fetch, extract, reconcile, notify.
//!
//! - `reconcile`: change detection against persisted state
//! - `dispatch`: per-source loop with failure isolation
//! - `run_check`: one cycle wired from configuration

pub mod check;
pub mod dispatch;
pub mod reconcile;

pub use check::{alert_setup_failure, run_check};
pub use dispatch::{Dispatcher, RunReport, SourceOutcome, SourceStatus};
pub use reconcile::{
    DocumentOutcome, Reconciler, reconcile_documents, reconcile_latest_record,
};
