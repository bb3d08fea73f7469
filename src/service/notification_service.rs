// service/notification_service.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Notification webhook is not configured")]
    NotConfigured,

    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook rejected the message with status {0}")]
    Rejected(u16),
}

/// One-shot outbound channel for leader announcements. No retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), TransportError>;
}

/// Posts `{"text": ...}` to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let Some(webhook_url) = self.webhook_url.as_deref() else {
            return Err(TransportError::NotConfigured);
        };

        tracing::info!("Sending Slack message...");
        let response = self
            .client
            .post(webhook_url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected(status.as_u16()));
        }

        tracing::info!("Slack message sent!");
        Ok(())
    }
}
