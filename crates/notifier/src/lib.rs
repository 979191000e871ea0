//! Channel senders.
//!
//! Each sender turns a persisted `NotificationRecord` into one provider call and
//! maps every provider failure onto [`SendError`]:
//! - Email via the SendGrid v3 HTTP API
//! - Telegram via the Bot API `sendMessage` method
//!
//! Providers sit behind small traits (`EmailProvider`, `ChatProvider`) so the
//! sender logic can be exercised without network access.

pub mod email;
pub mod error;
pub mod sender;
pub mod telegram;

pub use email::{EmailProvider, EmailSender, SendGridClient};
pub use error::{ConfigError, SendError};
pub use sender::ChannelSender;
pub use telegram::{ChatProvider, ChatSender, TelegramBotClient};
