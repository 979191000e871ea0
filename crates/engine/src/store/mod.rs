//! Record store adapter, the persistence boundary for notification records.
//!
//! Stores carry no business logic. They stamp timestamps, hand out identifiers
//! and keep `sent_at` in step with `status`; deciding which status to write is
//! the dispatch service's job.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{NotificationRecord, NotificationStatus};

pub use memory::MemoryNotificationStore;
pub use postgres::PgNotificationStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("notification not found: {0}")]
    NotFound(Uuid),

    #[error("failed to {operation} notification: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("corrupt notification row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => {
                AppError::NotFound(format!("Notification {} not found", id))
            }
            StoreError::Database { source, .. } => AppError::Database(source),
            StoreError::Corrupt(msg) => AppError::Internal(msg),
        }
    }
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new record and return the store-assigned identifier.
    ///
    /// `created_at`/`updated_at` are set at call time, overwriting whatever the
    /// caller supplied.
    async fn create(&self, record: &NotificationRecord) -> Result<Uuid, StoreError>;

    /// Set `status`, bump `updated_at`, and set `sent_at` only when `status` is Sent.
    /// Unknown ids are an error.
    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> Result<(), StoreError>;

    /// Fetch a record by id. Inspection only; not used on the dispatch path.
    async fn get(&self, id: Uuid) -> Result<NotificationRecord, StoreError>;
}
