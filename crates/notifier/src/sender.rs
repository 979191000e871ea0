use async_trait::async_trait;

use courier_common::types::NotificationRecord;

use crate::error::SendError;

/// One outbound notification medium.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Deliver the record's subject and content to `record.channel`.
    async fn send(&self, record: &NotificationRecord) -> Result<(), SendError>;
}
