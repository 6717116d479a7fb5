use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("Event publish failed: {0}")]
pub struct EventError(pub String);

/// Sink for domain events (Kafka, logs, tests)
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), EventError>;
}
