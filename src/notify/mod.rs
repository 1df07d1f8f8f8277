//! Notification delivery.
//!
//! [`SlackNotifier`] posts Block Kit messages through the Slack Web API;
//! [`LogNotifier`] only logs, for dry runs.

mod dry_run;
mod slack;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Notification;

pub use dry_run::LogNotifier;
pub use slack::{SLACK_POST_MESSAGE_URL, SlackMessage, SlackNotifier};

/// Delivers notifications and operational alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the main channel about new items.
    async fn notify(&self, notification: &Notification) -> Result<()>;

    /// Tell operators that something went wrong.
    async fn alert_admin(&self, message: &str, error: Option<&AppError>) -> Result<()>;
}
