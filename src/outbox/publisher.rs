//! Push sink capability
//!
//! The hosted fan-out fabric is external; the core only needs
//! `publish(channel, event, payload)`.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("push sink request failed: {0}")]
    Transport(String),

    #[error("push sink rejected event: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, event: &str, payload: &Value)
    -> Result<(), PublishError>;
}

/// HTTP push sink client. Posts `{channel, event, payload}` to the
/// configured endpoint.
pub struct HttpPublisher {
    client: reqwest::Client,
    sink_url: String,
}

impl HttpPublisher {
    pub fn new(sink_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            sink_url: sink_url.to_string(),
        })
    }
}

#[async_trait]
impl EventPublisher for HttpPublisher {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.sink_url)
            .json(&json!({
                "channel": channel,
                "event": event,
                "payload": payload,
            }))
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// In-process publisher for tests: records every event and can be told to
/// fail the next N publishes.
#[derive(Default)]
pub struct MockPublisher {
    published: std::sync::Mutex<Vec<PublishedEvent>>,
    fail_remaining: std::sync::atomic::AtomicU32,
}

#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub channel: String,
    pub event: String,
    pub payload: Value,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` publish calls fail with a transport error
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining
            .store(n, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl EventPublisher for MockPublisher {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), PublishError> {
        let remaining = self
            .fail_remaining
            .load(std::sync::atomic::Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining
                .store(remaining - 1, std::sync::atomic::Ordering::SeqCst);
            return Err(PublishError::Transport("injected failure".to_string()));
        }

        self.published.lock().unwrap().push(PublishedEvent {
            channel: channel.to_string(),
            event: event.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_publisher_records_events() {
        let publisher = MockPublisher::new();
        publisher
            .publish("user.7", "money.received", &json!({"amount": 100}))
            .await
            .unwrap();

        let events = publisher.published();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, "user.7");
        assert_eq!(events[0].event, "money.received");
        assert_eq!(events[0].payload["amount"], 100);
    }

    #[tokio::test]
    async fn test_mock_publisher_injected_failures() {
        let publisher = MockPublisher::new();
        publisher.fail_next(2);

        assert!(publisher.publish("c", "e", &json!({})).await.is_err());
        assert!(publisher.publish("c", "e", &json!({})).await.is_err());
        assert!(publisher.publish("c", "e", &json!({})).await.is_ok());
        assert_eq!(publisher.published_count(), 1);
    }
}
