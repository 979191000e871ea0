use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Outbound channel a notification is addressed to.
///
/// The wire value is a free string; anything other than `email` or `telegram`
/// is kept as `Unsupported` so the request can still be recorded and marked failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    Email,
    Telegram,
    Unsupported(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Telegram => "telegram",
            NotificationType::Unsupported(raw) => raw,
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "email" => NotificationType::Email,
            "telegram" => NotificationType::Telegram,
            _ => NotificationType::Unsupported(value),
        }
    }
}

impl From<&str> for NotificationType {
    fn from(value: &str) -> Self {
        NotificationType::from(value.to_string())
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Unsupported(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// An absent `type` decodes to an empty unsupported type, which dispatch records as failed.
impl Default for NotificationType {
    fn default() -> Self {
        NotificationType::Unsupported(String::new())
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification lifecycle status. Transitions are one-way: Pending → Sent | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NotificationStatus::Pending)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            other => Err(format!("unknown notification status '{}'", other)),
        }
    }
}

/// Free-form metadata attached to a request and carried onto the record.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A notification request decoded from one log record.
///
/// Absent or `null` fields decode as empty; only malformed JSON or a
/// wrongly-typed value fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub notification_type: NotificationType,
    /// Email address or numeric chat id, depending on `notification_type`
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// The persisted representation of a single notification attempt.
///
/// Invariant: `sent_at.is_some()` iff `status == NotificationStatus::Sent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Assigned by the store on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub channel: String,
    pub subject: String,
    pub content: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl NotificationRecord {
    /// Build an unsaved Pending record from an inbound request.
    pub fn pending(request: NotificationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id: request.user_id,
            notification_type: request.notification_type,
            channel: request.channel,
            subject: request.subject,
            content: request.content,
            status: NotificationStatus::Pending,
            created_at: now,
            updated_at: now,
            sent_at: None,
            metadata: request.metadata,
        }
    }

    /// Apply a status change the way every store must: bump `updated_at`,
    /// and keep `sent_at` populated exactly when the status is Sent.
    pub fn apply_status(&mut self, status: NotificationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
        self.sent_at = match status {
            NotificationStatus::Sent => Some(now),
            _ => None,
        };
    }
}
