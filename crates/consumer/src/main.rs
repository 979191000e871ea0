use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use courier_common::config::AppConfig;
use courier_common::db;
use courier_consumer::consumer::LogConsumer;
use courier_consumer::kafka::KafkaSource;
use courier_engine::dispatch::{ChannelSenders, DispatchService};
use courier_engine::store::PgNotificationStore;
use courier_notifier::{ChannelSender, ChatSender, EmailSender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "courier_consumer=info,courier_engine=info,courier_notifier=info".into()
            }),
        )
        .json()
        .init();

    tracing::info!("Notification service starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(PgNotificationStore::new(
        pool,
        config.notifications_table.clone(),
    ));
    let dispatcher = Arc::new(DispatchService::new(store, build_senders(&config)));

    let source = Arc::new(KafkaSource::new(&config)?);
    let consumer = LogConsumer::new(
        source,
        dispatcher,
        config.kafka_topic.clone(),
        Duration::from_millis(config.consumer_poll_timeout_ms),
    );

    let cancel = CancellationToken::new();
    consumer.start(cancel.clone()).await?;

    let exited = consumer.wait();
    tokio::pin!(exited);

    let exited_early = tokio::select! {
        _ = shutdown_signal() => false,
        _ = &mut exited => true,
    };

    if exited_early {
        consumer.stop().await;
        anyhow::bail!("Consumer poll loop exited unexpectedly");
    }

    tracing::info!("Received termination signal, shutting down...");
    cancel.cancel();
    consumer.stop().await;
    exited.await;

    tracing::info!("Notification service stopped.");
    Ok(())
}

/// Build whichever senders have credentials. A channel without them stays
/// disabled and every request for it is recorded as failed.
fn build_senders(config: &AppConfig) -> ChannelSenders {
    let email = match &config.sendgrid_api_key {
        Some(api_key) => match EmailSender::sendgrid(
            api_key,
            config.sendgrid_from_email.as_deref().unwrap_or_default(),
            &config.sendgrid_from_name,
        ) {
            Ok(sender) => Some(Arc::new(sender) as Arc<dyn ChannelSender>),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create SendGrid client, email disabled");
                None
            }
        },
        None => {
            tracing::warn!("SendGrid API key not provided, email notifications will not be available");
            None
        }
    };

    let telegram = match &config.telegram_bot_token {
        Some(token) => match ChatSender::telegram(token) {
            Ok(sender) => Some(Arc::new(sender) as Arc<dyn ChannelSender>),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create Telegram client, telegram disabled");
                None
            }
        },
        None => {
            tracing::warn!(
                "Telegram bot token not provided, Telegram notifications will not be available"
            );
            None
        }
    };

    ChannelSenders { email, telegram }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
