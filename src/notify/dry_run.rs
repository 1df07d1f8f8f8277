//! Notifier that writes to the log instead of Slack.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Notification;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        log::info!("[dry-run] would notify: {}", notification.summary());
        log::debug!(
            "[dry-run] payload: {}",
            serde_json::to_string(notification)?
        );
        Ok(())
    }

    async fn alert_admin(&self, message: &str, error: Option<&AppError>) -> Result<()> {
        match error {
            Some(e) => log::warn!("[dry-run] admin alert: {} ({}: {})", message, e.kind(), e),
            None => log::warn!("[dry-run] admin alert: {}", message),
        }
        Ok(())
    }
}
