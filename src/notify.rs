// src/notify.rs

use serde::Serialize;

use crate::config::Config;

/// Payload posted to the notification webhook when an attempt reaches a
/// reportable state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEvent {
    pub event: &'static str,
    pub test_slug: String,
    pub candidate_email: String,
    pub attempt_id: i64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
}

/// Fire-and-forget dispatch off the request path.
///
/// Delivery is best-effort: failures are logged and swallowed, never
/// surfaced to the candidate or the owning operation.
pub fn dispatch(config: &Config, event: AttemptEvent) {
    let Some(webhook) = config.notify_webhook.clone() else {
        return;
    };

    tokio::spawn(async move {
        let client = reqwest::Client::new();
        match client.post(&webhook).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(event = event.event, attempt_id = event.attempt_id, "notification delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    event = event.event,
                    attempt_id = event.attempt_id,
                    status = %response.status(),
                    "notification endpoint rejected the event"
                );
            }
            Err(e) => {
                tracing::warn!(
                    event = event.event,
                    attempt_id = event.attempt_id,
                    "failed to deliver notification: {}",
                    e
                );
            }
        }
    });
}
