//! Publish a single notification request to the inbound topic.
//!
//! ## Usage
//!
//! ```bash
//! # Email
//! NOTIFY_CHANNEL="someone@example.com" cargo run --bin send-test-message
//!
//! # Telegram
//! NOTIFY_TYPE=telegram NOTIFY_CHANNEL=123456789 NOTIFY_SUBJECT="Alert" \
//!   NOTIFY_CONTENT="disk full" cargo run --bin send-test-message
//! ```
//!
//! ## Variables
//!
//! | Variable         | Field     | Default                                   |
//! |------------------|-----------|-------------------------------------------|
//! | `NOTIFY_TYPE`    | `type`    | `email`                                   |
//! | `NOTIFY_CHANNEL` | `channel` | required                                  |
//! | `NOTIFY_SUBJECT` | `subject` | `Test Notification`                       |
//! | `NOTIFY_CONTENT` | `content` | `This is a test notification from Kafka.` |
//! | `NOTIFY_USER_ID` | `user_id` | `user-123`                                |
//!
//! Broker and topic come from `KAFKA_BOOTSTRAP_SERVERS` / `KAFKA_TOPIC`.

use std::collections::HashMap;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use courier_common::types::NotificationRequest;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "send_test_message=info".into()),
        )
        .init();

    let channel = std::env::var("NOTIFY_CHANNEL").map_err(|_| {
        anyhow::anyhow!("NOTIFY_CHANNEL (email or telegram chat ID) is required")
    })?;

    let request = NotificationRequest {
        user_id: env_or("NOTIFY_USER_ID", "user-123"),
        notification_type: env_or("NOTIFY_TYPE", "email").into(),
        channel,
        subject: env_or("NOTIFY_SUBJECT", "Test Notification"),
        content: env_or("NOTIFY_CONTENT", "This is a test notification from Kafka."),
        metadata: Some(HashMap::from([
            (
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            ),
            (
                "source".to_string(),
                serde_json::Value::String("test-script".to_string()),
            ),
        ])),
    };
    let payload = serde_json::to_string(&request)?;

    let brokers = env_or("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092");
    let topic = env_or("KAFKA_TOPIC", "notifications");

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("message.timeout.ms", "15000")
        .create()?;

    let record: FutureRecord<'_, (), String> = FutureRecord::to(&topic).payload(&payload);
    match producer
        .send(record, Timeout::After(Duration::from_secs(15)))
        .await
    {
        Ok((partition, offset)) => {
            tracing::info!(topic = %topic, partition, offset, "Message delivered");
        }
        Err((e, _)) => {
            anyhow::bail!("Failed to deliver message: {}", e);
        }
    }

    producer.flush(Timeout::After(Duration::from_secs(15)))?;

    println!("Message sent successfully!");
    println!("Message: {}", payload);
    Ok(())
}
