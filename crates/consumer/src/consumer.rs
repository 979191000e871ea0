//! Log consumer: owns the poll loop and its start/stop lifecycle.
//!
//! A single task polls the source with a bounded timeout, decodes each record
//! and hands it to the handler before polling again. Per-partition order is
//! therefore preserved end to end. Decode and handler failures are logged and
//! the loop moves on; there is no retry and no dead-letter path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use courier_common::types::NotificationRequest;
use courier_engine::dispatch::{DispatchOutcome, DispatchService};

use crate::source::{BrokerError, LogRecord, LogSource};

/// Receives each successfully decoded request, one at a time.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, request: NotificationRequest) -> anyhow::Result<()>;
}

#[async_trait]
impl NotificationHandler for DispatchService {
    async fn handle(&self, request: NotificationRequest) -> anyhow::Result<()> {
        match self.process(request).await? {
            DispatchOutcome::Sent { .. } => {}
            DispatchOutcome::SentUnrecorded { id, error } => {
                warn!(
                    notification_id = %id,
                    error = %error,
                    "Notification delivered but its status could not be recorded"
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("consumer is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Subscribe(#[from] BrokerError),
}

/// Start/stop bookkeeping. Only touched under the lifecycle lock.
#[derive(Default)]
struct Lifecycle {
    shutdown: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    source: Arc<dyn LogSource>,
    handler: Arc<dyn NotificationHandler>,
    topic: String,
    poll_timeout: Duration,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl Shared {
    async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        if let Some(shutdown) = lifecycle.shutdown.take() {
            shutdown.cancel();
        }

        self.source.close();

        info!(topic = %self.topic, "Consumer stopped");
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken, shutdown: CancellationToken) {
        while self.running.load(Ordering::Acquire) {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancellation requested, stopping consumer");
                    self.stop().await;
                    break;
                }
                _ = shutdown.cancelled() => break,
                polled = self.source.poll(self.poll_timeout) => polled,
            };

            match polled {
                Ok(None) => {}
                Ok(Some(record)) => self.handle_record(record).await,
                Err(e) => warn!(error = %e, "Error reading message"),
            }
        }

        debug!(topic = %self.topic, "Poll loop exited");
    }

    async fn handle_record(&self, record: LogRecord) {
        debug!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "Received message"
        );

        let request: NotificationRequest = match serde_json::from_slice(&record.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Dropping undecodable message"
                );
                return;
            }
        };

        if let Err(e) = self.handler.handle(request).await {
            error!(
                partition = record.partition,
                offset = record.offset,
                error = %e,
                "Error handling message"
            );
        }
    }
}

/// Consumes notification requests from a log source.
///
/// `start`, `stop` and `wait` may be called from any task; `stop` is idempotent
/// and releases the subscription exactly once per successful `start`.
pub struct LogConsumer {
    shared: Arc<Shared>,
}

impl LogConsumer {
    pub fn new(
        source: Arc<dyn LogSource>,
        handler: Arc<dyn NotificationHandler>,
        topic: impl Into<String>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                handler,
                topic: topic.into(),
                poll_timeout,
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Subscribe and spawn the poll loop.
    ///
    /// `cancel` is observed between polls; cancelling it performs an orderly `stop`.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), ConsumerError> {
        let mut lifecycle = self.shared.lifecycle.lock().await;
        if self.shared.running.load(Ordering::Acquire) {
            return Err(ConsumerError::AlreadyRunning);
        }

        self.shared.source.subscribe(&self.shared.topic).await?;

        let shutdown = CancellationToken::new();
        self.shared.running.store(true, Ordering::Release);
        lifecycle.shutdown = Some(shutdown.clone());
        lifecycle.task = Some(tokio::spawn(self.shared.clone().run(cancel, shutdown)));

        info!(topic = %self.shared.topic, "Consumer started");
        Ok(())
    }

    /// Stop polling and release the subscription. In-flight handling finishes first.
    pub async fn stop(&self) {
        self.shared.stop().await;
    }

    /// Wait for the poll loop to exit.
    pub async fn wait(&self) {
        let task = self.shared.lifecycle.lock().await.task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Poll loop panicked");
            }
        }
    }
}
