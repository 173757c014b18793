use crate::models::NotificationEvent;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Webhook rejected event: {0}")]
    Rejected(String),
}

/// Delivery of protocol events to users
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Deliver an event without letting delivery affect the caller
///
/// Runs on a detached task; failures are logged and dropped.
pub fn dispatch(notifier: &Arc<dyn Notifier>, user_id: &str, event: NotificationEvent) {
    let notifier = Arc::clone(notifier);
    let user_id = user_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&user_id, &event).await {
            tracing::warn!("Notification to {} failed: {}", user_id, e);
        }
    });
}

/// Notifier that only logs, used when no webhook is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!("Notify {}: {:?}", user_id, event);
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    event: &'a NotificationEvent,
}

/// Posts each event as JSON to a webhook endpoint
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { user_id, event })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().to_string()));
        }

        tracing::debug!("Delivered {:?} to {}", event, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_webhook_posts_event() {
        let mut server = mockito::Server::new_async().await;
        let session_id = Uuid::new_v4();
        let mock = server
            .mock("POST", "/hooks")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "userId": "u1",
                "event": { "type": "session_completed", "sessionId": session_id.to_string() }
            })))
            .with_status(204)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hooks", server.url())).unwrap();
        notifier
            .notify("u1", &NotificationEvent::SessionCompleted { session_id })
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/hooks").with_status(500).create_async().await;

        let notifier = WebhookNotifier::new(format!("{}/hooks", server.url())).unwrap();
        let result = notifier
            .notify("u1", &NotificationEvent::SessionAbandoned { session_id: Uuid::new_v4() })
            .await;

        assert!(matches!(result, Err(NotifyError::Rejected(_))));
    }
}
