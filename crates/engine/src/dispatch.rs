//! Dispatch service: the notification lifecycle.
//!
//! For every inbound request:
//! 1. Persist a Pending record (failure aborts the request, nothing is sent)
//! 2. Route to the channel sender matching the request type
//! 3. Persist the terminal status (Sent or Failed)
//!
//! The result reflects the send outcome only. A failed status update after a
//! successful send is reported as [`DispatchOutcome::SentUnrecorded`], not as an error.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use courier_common::types::{
    NotificationRecord, NotificationRequest, NotificationStatus, NotificationType,
};
use courier_notifier::{ChannelSender, SendError};

use crate::store::{NotificationStore, StoreError};

/// Senders available to the dispatcher. A `None` slot is a channel whose
/// credentials were missing at startup.
#[derive(Clone, Default)]
pub struct ChannelSenders {
    pub email: Option<Arc<dyn ChannelSender>>,
    pub telegram: Option<Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    /// Exhaustive over `NotificationType`: a new channel will not compile until routed here.
    fn route(
        &self,
        notification_type: &NotificationType,
    ) -> Result<&dyn ChannelSender, DispatchError> {
        let (slot, name) = match notification_type {
            NotificationType::Email => (&self.email, "email"),
            NotificationType::Telegram => (&self.telegram, "telegram"),
            NotificationType::Unsupported(raw) => {
                return Err(DispatchError::UnsupportedType(raw.clone()));
            }
        };

        slot.as_deref()
            .ok_or(DispatchError::ChannelNotConfigured(name))
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to insert notification: {0}")]
    Create(#[source] StoreError),

    #[error("{0} client not configured")]
    ChannelNotConfigured(&'static str),

    #[error("unsupported notification type: {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Send(#[from] SendError),
}

impl DispatchError {
    /// Errors that will recur for every request of this kind until the deployment changes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DispatchError::ChannelNotConfigured(_) | DispatchError::UnsupportedType(_)
        )
    }
}

/// Successful outcome of [`DispatchService::process`].
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Delivered and recorded as Sent.
    Sent { id: Uuid },
    /// Delivered, but the record still says Pending because the status update failed.
    SentUnrecorded { id: Uuid, error: StoreError },
}

impl DispatchOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            DispatchOutcome::Sent { id } | DispatchOutcome::SentUnrecorded { id, .. } => *id,
        }
    }
}

/// Sole writer of notification records.
pub struct DispatchService {
    store: Arc<dyn NotificationStore>,
    senders: ChannelSenders,
}

impl DispatchService {
    pub fn new(store: Arc<dyn NotificationStore>, senders: ChannelSenders) -> Self {
        Self { store, senders }
    }

    /// Record, deliver and reconcile a single notification request.
    pub async fn process(
        &self,
        request: NotificationRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        tracing::info!(
            user_id = %request.user_id,
            notification_type = %request.notification_type,
            "Processing notification"
        );

        let mut record = NotificationRecord::pending(request);
        let id = self
            .store
            .create(&record)
            .await
            .map_err(DispatchError::Create)?;
        record.id = Some(id);

        tracing::info!(notification_id = %id, "Notification inserted");

        let send_result = self.dispatch(&record).await;

        let status = match &send_result {
            Ok(()) => {
                tracing::info!(notification_id = %id, "Notification sent successfully");
                NotificationStatus::Sent
            }
            Err(e) => {
                tracing::warn!(notification_id = %id, error = %e, "Failed to send notification");
                NotificationStatus::Failed
            }
        };

        let update_result = self.store.update_status(id, status).await;
        if let Err(e) = &update_result {
            tracing::error!(
                notification_id = %id,
                status = %status,
                error = %e,
                "Failed to update notification status"
            );
        }

        send_result?;

        Ok(match update_result {
            Ok(()) => DispatchOutcome::Sent { id },
            Err(error) => DispatchOutcome::SentUnrecorded { id, error },
        })
    }

    async fn dispatch(&self, record: &NotificationRecord) -> Result<(), DispatchError> {
        let sender = self.senders.route(&record.notification_type)?;

        tracing::debug!(
            notification_type = %record.notification_type,
            channel = %record.channel,
            "Dispatching notification"
        );

        sender.send(record).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use courier_notifier::ChatSender;
    use courier_notifier::telegram::{ChatProvider, ParseMode};

    use crate::store::MemoryNotificationStore;

    type Journal = Arc<Mutex<Vec<&'static str>>>;

    /// Memory store that journals calls and can be told to fail.
    struct JournalingStore {
        inner: MemoryNotificationStore,
        journal: Journal,
        fail_create: AtomicBool,
        fail_update: AtomicBool,
    }

    impl JournalingStore {
        fn new(journal: Journal) -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryNotificationStore::new(),
                journal,
                fail_create: AtomicBool::new(false),
                fail_update: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl NotificationStore for JournalingStore {
        async fn create(&self, record: &NotificationRecord) -> Result<Uuid, StoreError> {
            self.journal.lock().unwrap().push("create");
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(StoreError::Corrupt("insert rejected".to_string()));
            }
            self.inner.create(record).await
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: NotificationStatus,
        ) -> Result<(), StoreError> {
            self.journal.lock().unwrap().push("update");
            if self.fail_update.load(Ordering::SeqCst) {
                return Err(StoreError::Corrupt("update rejected".to_string()));
            }
            self.inner.update_status(id, status).await
        }

        async fn get(&self, id: Uuid) -> Result<NotificationRecord, StoreError> {
            self.inner.get(id).await
        }
    }

    struct StubSender {
        journal: Journal,
        succeed: bool,
    }

    #[async_trait]
    impl ChannelSender for StubSender {
        async fn send(&self, _record: &NotificationRecord) -> Result<(), SendError> {
            self.journal.lock().unwrap().push("send");
            if self.succeed {
                Ok(())
            } else {
                Err(SendError::Rejected {
                    status: 500,
                    body: "provider down".to_string(),
                })
            }
        }
    }

    /// Rejects chat id 0 like the Bot API.
    struct ZeroRejectingBot {
        journal: Journal,
    }

    #[async_trait]
    impl ChatProvider for ZeroRejectingBot {
        async fn send_message(
            &self,
            chat_id: i64,
            _text: &str,
            _parse_mode: ParseMode,
        ) -> Result<(), SendError> {
            self.journal.lock().unwrap().push("send");
            if chat_id == 0 {
                return Err(SendError::Api("Bad Request: chat not found".to_string()));
            }
            Ok(())
        }
    }

    fn request(notification_type: &str, channel: &str) -> NotificationRequest {
        NotificationRequest {
            user_id: "user-123".to_string(),
            notification_type: notification_type.into(),
            channel: channel.to_string(),
            subject: "Hi".to_string(),
            content: "Body".to_string(),
            metadata: None,
        }
    }

    fn service(store: Arc<JournalingStore>, journal: &Journal, succeed: bool) -> DispatchService {
        let email: Arc<dyn ChannelSender> = Arc::new(StubSender {
            journal: journal.clone(),
            succeed,
        });
        let bot = Arc::new(ZeroRejectingBot {
            journal: journal.clone(),
        });
        let telegram: Arc<dyn ChannelSender> = Arc::new(ChatSender::new(bot));
        DispatchService::new(
            store,
            ChannelSenders {
                email: Some(email),
                telegram: Some(telegram),
            },
        )
    }

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_email_success_records_sent() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        let svc = service(store.clone(), &journal, true);

        let outcome = svc.process(request("email", "a@b.com")).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Sent { .. }));

        let record = store.get(outcome.id()).await.unwrap();
        assert_eq!(record.status, NotificationStatus::Sent);
        assert!(record.sent_at.is_some());
        assert_eq!(*journal.lock().unwrap(), vec!["create", "send", "update"]);
    }

    #[tokio::test]
    async fn test_unparseable_chat_id_records_failed() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        let svc = service(store.clone(), &journal, true);

        let err = svc
            .process(request("telegram", "not-a-number"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Send(SendError::Api(_))));

        let records = store.inner.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, NotificationStatus::Failed);
        assert!(records[0].sent_at.is_none());
        assert_eq!(*journal.lock().unwrap(), vec!["create", "send", "update"]);
    }

    #[tokio::test]
    async fn test_unsupported_type_records_failed_without_sending() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        let svc = service(store.clone(), &journal, true);

        let err = svc.process(request("sms", "+15550100")).await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported notification type: sms");
        assert!(err.is_configuration());

        let records = store.inner.records().await;
        assert_eq!(records[0].status, NotificationStatus::Failed);
        assert_eq!(*journal.lock().unwrap(), vec!["create", "update"]);
    }

    #[tokio::test]
    async fn test_missing_type_records_failed() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        let svc = service(store.clone(), &journal, true);

        let err = svc.process(request("", "a@b.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported notification type: ");

        let records = store.inner.records().await;
        assert_eq!(records[0].status, NotificationStatus::Failed);
        assert_eq!(*journal.lock().unwrap(), vec!["create", "update"]);
    }

    #[tokio::test]
    async fn test_create_failure_skips_send_and_update() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        store.fail_create.store(true, Ordering::SeqCst);
        let svc = service(store.clone(), &journal, true);

        let err = svc.process(request("email", "a@b.com")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Create(_)));

        let calls = journal.lock().unwrap();
        assert_eq!(*calls, vec!["create"]);
        assert_eq!(calls.iter().filter(|c| **c == "send").count(), 0);
    }

    #[tokio::test]
    async fn test_update_failure_after_send_is_not_an_error() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        store.fail_update.store(true, Ordering::SeqCst);
        let svc = service(store.clone(), &journal, true);

        let outcome = svc.process(request("email", "a@b.com")).await.unwrap();
        let id = match outcome {
            DispatchOutcome::SentUnrecorded { id, .. } => id,
            other => panic!("expected SentUnrecorded, got {:?}", other),
        };

        // The record is left Pending; that inconsistency is surfaced, not masked.
        let record = store.get(id).await.unwrap();
        assert_eq!(record.status, NotificationStatus::Pending);
        assert!(record.sent_at.is_none());
    }

    #[tokio::test]
    async fn test_send_failure_wins_over_update_failure() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        store.fail_update.store(true, Ordering::SeqCst);
        let svc = service(store.clone(), &journal, false);

        let err = svc.process(request("email", "a@b.com")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Send(SendError::Rejected { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_missing_sender_is_a_configuration_failure() {
        let journal = journal();
        let store = JournalingStore::new(journal.clone());
        let svc = DispatchService::new(store.clone(), ChannelSenders::default());

        let err = svc.process(request("telegram", "12345")).await.unwrap_err();
        assert_eq!(err.to_string(), "telegram client not configured");
        assert!(err.is_configuration());

        let records = store.inner.records().await;
        assert_eq!(records[0].status, NotificationStatus::Failed);
        assert_eq!(*journal.lock().unwrap(), vec!["create", "update"]);
    }

    #[tokio::test]
    async fn test_sent_at_present_iff_sent_on_every_path() {
        let cases = [
            ("email", "a@b.com", true),
            ("email", "a@b.com", false),
            ("telegram", "12345", true),
            ("telegram", "oops", true),
            ("pager", "x", true),
        ];

        for (kind, channel, succeed) in cases {
            let journal = journal();
            let store = JournalingStore::new(journal.clone());
            let svc = service(store.clone(), &journal, succeed);

            let _ = svc.process(request(kind, channel)).await;

            for record in store.inner.records().await {
                assert_eq!(
                    record.sent_at.is_some(),
                    record.status == NotificationStatus::Sent,
                    "case {kind}/{channel}/{succeed}"
                );
            }
        }
    }
}
