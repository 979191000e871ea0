//! Kafka-backed log source.
//!
//! Offsets are committed automatically on a fixed interval
//! (`enable.auto.commit=true`), independent of whether dispatch succeeded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use tracing::info;

use courier_common::config::AppConfig;

use crate::source::{BrokerError, LogRecord, LogSource};

/// How long `subscribe` waits for broker metadata before declaring startup failed.
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the consumer's client configuration from the application config.
///
/// - `auto.offset.reset=earliest`: read from the beginning on first start.
/// - `enable.auto.commit=true`: offsets advance regardless of handler outcome.
pub fn client_config(config: &AppConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_bootstrap_servers)
        .set("group.id", &config.kafka_group_id)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "true")
        .set(
            "auto.commit.interval.ms",
            config.kafka_auto_commit_interval_ms.to_string(),
        )
        .set("allow.auto.create.topics", "true")
        .set("session.timeout.ms", "30000")
        .set("heartbeat.interval.ms", "3000");
    client_config
}

pub struct KafkaSource {
    consumer: Arc<StreamConsumer>,
}

impl KafkaSource {
    pub fn new(config: &AppConfig) -> Result<Self, BrokerError> {
        info!(
            brokers = %config.kafka_bootstrap_servers,
            group = %config.kafka_group_id,
            "Initializing Kafka consumer"
        );

        let consumer: StreamConsumer = client_config(config)
            .create()
            .map_err(|e| BrokerError::Create(e.to_string()))?;

        Ok(Self {
            consumer: Arc::new(consumer),
        })
    }
}

#[async_trait]
impl LogSource for KafkaSource {
    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        let subscribe_error = |reason: String| BrokerError::Subscribe {
            topic: topic.to_string(),
            reason,
        };

        // librdkafka connects lazily; fetch metadata so an unreachable broker
        // fails startup instead of surfacing later as read errors.
        let consumer = self.consumer.clone();
        let owned_topic = topic.to_string();
        tokio::task::spawn_blocking(move || {
            consumer.fetch_metadata(Some(owned_topic.as_str()), METADATA_TIMEOUT)
        })
        .await
        .map_err(|e| subscribe_error(e.to_string()))?
        .map_err(|e| subscribe_error(e.to_string()))?;

        self.consumer
            .subscribe(&[topic])
            .map_err(|e| subscribe_error(e.to_string()))?;

        info!(topic, "Kafka consumer subscribed");
        Ok(())
    }

    async fn poll(&self, timeout: Duration) -> Result<Option<LogRecord>, BrokerError> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Err(e)) => Err(BrokerError::Read(e.to_string())),
            Ok(Ok(message)) => Ok(Some(LogRecord {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
                payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            })),
        }
    }

    fn close(&self) {
        self.consumer.unsubscribe();
        info!("Kafka consumer unsubscribed");
    }
}
