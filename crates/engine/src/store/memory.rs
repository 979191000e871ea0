use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use courier_common::types::{NotificationRecord, NotificationStatus};

use super::{NotificationStore, StoreError};

/// In-process store with the same semantics as the Postgres one.
///
/// Used for local runs without a database and as the backing store in tests.
#[derive(Default)]
pub struct MemoryNotificationStore {
    records: RwLock<HashMap<Uuid, NotificationRecord>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records, oldest first.
    pub async fn records(&self) -> Vec<NotificationRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, record: &NotificationRecord) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut stored = record.clone();
        stored.id = Some(id);
        stored.created_at = now;
        stored.apply_status(record.status, now);

        self.records.write().await.insert(id, stored);
        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.apply_status(status, Utc::now());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<NotificationRecord, StoreError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use courier_common::types::{NotificationRequest, NotificationType};

    fn pending() -> NotificationRecord {
        NotificationRecord::pending(NotificationRequest {
            user_id: "user-1".to_string(),
            notification_type: NotificationType::Email,
            channel: "a@b.com".to_string(),
            subject: "Hi".to_string(),
            content: "Body".to_string(),
            metadata: None,
        })
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_overwrites_timestamps() {
        let store = MemoryNotificationStore::new();
        let mut record = pending();
        let stale = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        record.created_at = stale;
        record.updated_at = stale;

        let id = store.create(&record).await.unwrap();
        let stored = store.get(id).await.unwrap();

        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.status, NotificationStatus::Pending);
        assert!(stored.created_at > stale + Duration::days(1));
        assert_eq!(stored.created_at, stored.updated_at);
        assert!(stored.sent_at.is_none());
    }

    #[tokio::test]
    async fn test_update_to_sent_sets_sent_at() {
        let store = MemoryNotificationStore::new();
        let id = store.create(&pending()).await.unwrap();

        store.update_status(id, NotificationStatus::Sent).await.unwrap();

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.status, NotificationStatus::Sent);
        assert_eq!(stored.sent_at, Some(stored.updated_at));
    }

    #[tokio::test]
    async fn test_update_to_failed_leaves_sent_at_unset() {
        let store = MemoryNotificationStore::new();
        let id = store.create(&pending()).await.unwrap();

        store.update_status(id, NotificationStatus::Failed).await.unwrap();

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.status, NotificationStatus::Failed);
        assert!(stored.sent_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_is_an_error() {
        let store = MemoryNotificationStore::new();
        let missing = Uuid::new_v4();

        let err = store
            .update_status(missing, NotificationStatus::Sent)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
        assert!(matches!(store.get(missing).await, Err(StoreError::NotFound(_))));
    }
}
