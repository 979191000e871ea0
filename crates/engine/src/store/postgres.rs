use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use courier_common::types::{Metadata, NotificationRecord, NotificationStatus};

use super::{NotificationStore, StoreError};

/// PostgreSQL-backed notification store.
///
/// The table name comes from configuration and is validated as a plain SQL
/// identifier before it reaches here (see `courier_common::config`).
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
    table: String,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<NotificationRecord, StoreError> {
        let corrupt = |e: sqlx::Error| StoreError::Corrupt(e.to_string());

        let status: String = row.try_get("status").map_err(corrupt)?;
        let status = status.parse::<NotificationStatus>().map_err(StoreError::Corrupt)?;

        let metadata: Option<serde_json::Value> = row.try_get("metadata").map_err(corrupt)?;
        let metadata = metadata
            .filter(|v| !v.is_null())
            .map(serde_json::from_value::<Metadata>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("metadata: {}", e)))?;

        let notification_type: String = row.try_get("type").map_err(corrupt)?;

        Ok(NotificationRecord {
            id: Some(row.try_get("id").map_err(corrupt)?),
            user_id: row.try_get("user_id").map_err(corrupt)?,
            notification_type: notification_type.into(),
            channel: row.try_get("channel").map_err(corrupt)?,
            subject: row.try_get("subject").map_err(corrupt)?,
            content: row.try_get("content").map_err(corrupt)?,
            status,
            created_at: row.try_get("created_at").map_err(corrupt)?,
            updated_at: row.try_get("updated_at").map_err(corrupt)?,
            sent_at: row.try_get("sent_at").map_err(corrupt)?,
            metadata,
        })
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, record: &NotificationRecord) -> Result<Uuid, StoreError> {
        let now = Utc::now();
        let mut stamped = record.clone();
        stamped.created_at = now;
        stamped.apply_status(record.status, now);

        let sql = format!(
            r#"
            INSERT INTO {} (user_id, type, channel, subject, content, status, metadata, created_at, updated_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
            self.table
        );

        let id: Uuid = sqlx::query_scalar(&sql)
            .bind(&stamped.user_id)
            .bind(stamped.notification_type.as_str())
            .bind(&stamped.channel)
            .bind(&stamped.subject)
            .bind(&stamped.content)
            .bind(stamped.status.to_string())
            .bind(stamped.metadata.as_ref().map(Json))
            .bind(stamped.created_at)
            .bind(stamped.updated_at)
            .bind(stamped.sent_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StoreError::Database {
                operation: "insert",
                source,
            })?;

        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> Result<(), StoreError> {
        let now = Utc::now();
        let sent_at = (status == NotificationStatus::Sent).then_some(now);

        let sql = format!(
            "UPDATE {} SET status = $1, updated_at = $2, sent_at = $3 WHERE id = $4",
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(status.to_string())
            .bind(now)
            .bind(sent_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Database {
                operation: "update status of",
                source,
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<NotificationRecord, StoreError> {
        let sql = format!(
            r#"
            SELECT id, user_id, type, channel, subject, content, status, metadata,
                   created_at, updated_at, sent_at
            FROM {}
            WHERE id = $1
            "#,
            self.table
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Database {
                operation: "get",
                source,
            })?
            .ok_or(StoreError::NotFound(id))?;

        Self::row_to_record(&row)
    }
}
