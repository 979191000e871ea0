use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// One record read from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to create Kafka consumer: {0}")]
    Create(String),

    #[error("failed to subscribe to topic '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("error reading message: {0}")]
    Read(String),
}

/// A partitioned, at-least-once log the consumer polls.
///
/// Offsets are tracked by the source itself; the consumer never commits.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError>;

    /// Wait up to `timeout` for the next record. `Ok(None)` means nothing arrived.
    async fn poll(&self, timeout: Duration) -> Result<Option<LogRecord>, BrokerError>;

    /// Release the subscription.
    fn close(&self);
}
