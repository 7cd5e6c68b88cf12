//! Operator notifications
//!
//! Used for the one-time "fully synced" notice and for fatal-error alerts.
//! Delivery failures are logged and never reach the caller.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        info!(subject, body, "Notification");
    }
}

/// POSTs notifications as JSON to a webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        let payload = json!({ "subject": subject, "body": body });
        let result = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = result {
            warn!(error = %e, subject, "Failed to deliver notification");
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((subject.to_string(), body.to_string()));
    }
}
