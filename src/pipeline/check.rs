// src/pipeline/check.rs

//! One complete check cycle, wired from configuration.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::notify::{LogNotifier, Notifier, SlackNotifier};
use crate::pipeline::dispatch::{Dispatcher, RunReport};
use crate::services::resolve_sources;
use crate::storage::open_state_store;
use crate::utils::http::HttpFetcher;

/// Build the collaborators from `config` and check every target once.
///
/// Errors are setup failures (no usable sources, bad Slack settings,
/// storage that cannot be opened). Per-source failures are reported in
/// the returned [`RunReport`].
pub async fn run_check(config: &Config, dry_run: bool) -> Result<RunReport> {
    let sources = resolve_sources(config);
    if sources.is_empty() {
        return Err(AppError::config(
            "None of the configured targets has an extractor",
        ));
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let notifier: Arc<dyn Notifier> = if dry_run {
        log::info!("Dry run: notifications are logged, not sent");
        Arc::new(LogNotifier)
    } else {
        Arc::new(SlackNotifier::new(&config.slack, &config.http)?)
    };
    let store = open_state_store(&config.storage).await?;

    let mut dispatcher = Dispatcher::new(fetcher, notifier, store);
    Ok(dispatcher.run(&sources).await)
}

/// Best-effort admin alert for a run that could not start.
///
/// Skipped when the Slack settings themselves are unusable.
pub async fn alert_setup_failure(config: &Config, error: &AppError) {
    let notifier = match SlackNotifier::new(&config.slack, &config.http) {
        Ok(notifier) => notifier,
        Err(e) => {
            log::debug!("Cannot send setup alert: {}", e);
            return;
        }
    };
    if let Err(e) = notifier
        .alert_admin("Check run could not start", Some(error))
        .await
    {
        log::error!("Failed to deliver setup alert: {}", e);
    }
}
