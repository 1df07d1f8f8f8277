// src/notify/slack.rs

//! Slack Web API notifier.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{DocumentItem, HttpConfig, LatestRecord, Notification, SlackConfig};
use crate::notify::Notifier;
use crate::utils::http::create_async_client;

pub const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Documents listed individually before the rest are summarized.
const DOCUMENT_LIMIT: usize = 10;

const DOCUMENTS_HEADER: &str = "📄 New documents";
const MEETING_HEADER: &str = "🏥 New Central Social Insurance Medical Council meeting";
const ADMIN_HEADER: &str = "🚨 MedFeeBot admin alert";

/// A chat.postMessage body without the channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    /// Plain fallback shown in notifications
    pub text: String,
    pub blocks: Vec<Value>,
}

impl SlackMessage {
    /// Message announcing new documents on a document-list page.
    pub fn documents(documents: &[DocumentItem], source: &str) -> Self {
        let header = format!("{} ({})", DOCUMENTS_HEADER, documents.len());
        let mut blocks = vec![
            header_block(&header),
            mrkdwn_section(&format!(
                "New documents were published on <{}|the monitored page>.",
                source
            )),
            json!({ "type": "divider" }),
        ];

        blocks.extend(documents.iter().take(DOCUMENT_LIMIT).map(|doc| {
            mrkdwn_section(&format!(
                "📅 *{}*\n📄 <{}|{}>",
                escape(&doc.date),
                doc.url,
                escape(&doc.title)
            ))
        }));

        if documents.len() > DOCUMENT_LIMIT {
            blocks.push(json!({
                "type": "context",
                "elements": [{
                    "type": "plain_text",
                    "text": format!("…and {} more documents", documents.len() - DOCUMENT_LIMIT),
                    "emoji": true
                }]
            }));
        }

        Self {
            text: format!("{}\n{}", header, source),
            blocks,
        }
    }

    /// Message announcing a new latest meeting record.
    pub fn meeting(record: &LatestRecord, source: &str) -> Self {
        let topics = record
            .topics
            .iter()
            .map(|topic| format!("• {}", escape(topic)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut blocks = vec![
            header_block(MEETING_HEADER),
            json!({
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*Source:*\n<{}|Chuikyo general meeting>", source) },
                    { "type": "mrkdwn", "text": format!("*Meeting:*\n{}", escape(&record.id)) },
                    { "type": "mrkdwn", "text": format!("*Date:*\n{}", escape(&record.date)) }
                ]
            }),
            mrkdwn_section(&format!("*Topics:*\n{}", topics)),
            json!({ "type": "divider" }),
        ];

        let buttons: Vec<Value> = record
            .links()
            .map(|link| {
                json!({
                    "type": "button",
                    "text": { "type": "plain_text", "text": link.label, "emoji": true },
                    "url": link.url
                })
            })
            .collect();
        if !buttons.is_empty() {
            blocks.push(json!({ "type": "actions", "elements": buttons }));
        }

        Self {
            text: format!("{}: {} ({})\n{}", MEETING_HEADER, record.id, record.date, source),
            blocks,
        }
    }

    /// Message for the admin channel.
    pub fn admin_alert(message: &str, error: Option<&AppError>) -> Self {
        let mut text = format!("{}\n{}", ADMIN_HEADER, message);
        let mut blocks = vec![header_block(ADMIN_HEADER), mrkdwn_section(message)];

        if let Some(error) = error {
            let details = format!("```{}: {}```", error.kind(), error);
            blocks.push(mrkdwn_section(&format!("*Error details:*\n{}", details)));
            text.push_str(&format!("\nError details:\n{}", details));
        }

        Self { text, blocks }
    }

    pub fn for_notification(notification: &Notification) -> Self {
        match notification {
            Notification::Documents { documents, source } => Self::documents(documents, source),
            Notification::Meeting { record, source } => Self::meeting(record, source),
        }
    }
}

fn header_block(text: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text, "emoji": true }
    })
}

fn mrkdwn_section(text: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text }
    })
}

/// Escape the characters Slack treats as control sequences in mrkdwn.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Posts messages with a bot token.
pub struct SlackNotifier {
    client: Client,
    endpoint: String,
    token: String,
    channel_id: String,
    admin_channel_id: Option<String>,
}

impl SlackNotifier {
    pub fn new(slack: &SlackConfig, http: &HttpConfig) -> Result<Self> {
        slack.validate()?;
        Ok(Self {
            client: create_async_client(http)?,
            endpoint: SLACK_POST_MESSAGE_URL.to_string(),
            token: slack.token.clone(),
            channel_id: slack.channel_id.clone(),
            admin_channel_id: slack
                .admin_channel_id
                .clone()
                .filter(|channel| !channel.trim().is_empty()),
        })
    }

    /// Override the API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn post(&self, channel: &str, message: &SlackMessage) -> Result<()> {
        log::debug!("Posting Slack message to channel {}", channel);
        let body = json!({
            "channel": channel,
            "text": message.text,
            "blocks": message.blocks,
        });

        let response: PostMessageResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown_error".to_string());
            log::error!("Slack API error for channel {}: {}", channel, error);
            return Err(AppError::Slack(error));
        }

        log::info!(
            "Slack message sent to {} (ts: {})",
            channel,
            response.ts.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        log::info!("Sending notification: {}", notification.summary());
        let message = SlackMessage::for_notification(notification);
        self.post(&self.channel_id, &message).await
    }

    async fn alert_admin(&self, message: &str, error: Option<&AppError>) -> Result<()> {
        let Some(channel) = &self.admin_channel_id else {
            log::debug!("No admin channel configured; alert not sent: {}", message);
            return Ok(());
        };
        self.post(channel, &SlackMessage::admin_alert(message, error))
            .await
    }
}
