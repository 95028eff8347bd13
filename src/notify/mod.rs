/// Notifier collaborators for messaging-channel nodes
///
/// The engine does not own any third-party wire format. A notifier is the
/// capability "send a notification, get back success/failure"; per-channel
/// clients live behind the `Notifier` trait and are registered by channel tag
/// ("slack", "discord"). A missing notifier means the node simulates the send
/// instead of failing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Soft outcome of a notification attempt
///
/// Notifier failures never abort a run, so `send` reports failure as data
/// rather than as an error.
#[derive(Debug, Clone)]
pub struct NotifyOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl NotifyOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// A channel-specific notification client
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `payload` to `destination` (channel name, address, ...)
    async fn send(&self, destination: &str, payload: &Value) -> NotifyOutcome;
}

/// Channel tag → notifier lookup used by the messaging node handlers
#[derive(Default)]
pub struct NotifierRegistry {
    channels: HashMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: impl Into<String>, notifier: Arc<dyn Notifier>) {
        self.channels.insert(channel.into(), notifier);
    }

    pub fn get(&self, channel: &str) -> Option<Arc<dyn Notifier>> {
        self.channels.get(channel).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Notifier that POSTs the payload to an incoming-webhook URL
///
/// Works for both Slack and Discord style incoming webhooks; the destination
/// (channel name) is attached to the payload since the webhook URL already
/// pins the target.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, destination: &str, payload: &Value) -> NotifyOutcome {
        let body = serde_json::json!({
            "destination": destination,
            "payload": payload,
        });

        match self.client.post(&self.url).json(&body).send().await {
            Ok(response) if response.status().is_success() => NotifyOutcome::ok(),
            Ok(response) => {
                NotifyOutcome::failed(format!("notifier returned status {}", response.status()))
            }
            Err(e) => NotifyOutcome::failed(format!("notifier request failed: {e}")),
        }
    }
}
