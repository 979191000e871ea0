//! Telegram delivery through the Bot API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use courier_common::types::NotificationRecord;

use crate::error::{ConfigError, SendError};
use crate::sender::ChannelSender;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Text formatting mode understood by the Bot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

/// Transport for chat messages.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), SendError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: ParseMode,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Map a Bot API reply onto a send result.
fn interpret_response(status: u16, body: &str) -> Result<(), SendError> {
    match serde_json::from_str::<ApiResponse>(body) {
        Ok(reply) if reply.ok => Ok(()),
        Ok(reply) => Err(SendError::Api(
            reply
                .description
                .unwrap_or_else(|| format!("request failed with status {}", status)),
        )),
        Err(_) => Err(SendError::Api(format!(
            "unexpected response (status {}): {}",
            status, body
        ))),
    }
}

/// Telegram Bot API client.
pub struct TelegramBotClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl TelegramBotClient {
    pub fn new(token: &str) -> Result<Self, ConfigError> {
        Self::with_base_url(token, TELEGRAM_API_BASE)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ConfigError> {
        if token.trim().is_empty() {
            return Err(ConfigError::MissingBotToken);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatProvider for TelegramBotClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), SendError> {
        let response = self
            .http
            .post(format!("{}/bot{}/sendMessage", self.base_url, self.token))
            .json(&SendMessageRequest {
                chat_id,
                text,
                parse_mode,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        interpret_response(status, &body)
    }
}

/// Chat channel sender.
pub struct ChatSender {
    provider: Arc<dyn ChatProvider>,
}

impl ChatSender {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Build a sender backed by the Telegram Bot API.
    pub fn telegram(bot_token: &str) -> Result<Self, ConfigError> {
        let client = TelegramBotClient::new(bot_token)?;
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl ChannelSender for ChatSender {
    async fn send(&self, record: &NotificationRecord) -> Result<(), SendError> {
        if record.channel.is_empty() {
            return Err(SendError::InvalidDestination(
                "telegram channel ID must be provided",
            ));
        }

        let chat_id = parse_chat_id(&record.channel);
        let text = format_message(&record.subject, &record.content);

        tracing::debug!(chat_id, "Sending telegram message");
        self.provider
            .send_message(chat_id, &text, ParseMode::Markdown)
            .await
    }
}

/// `*subject*\n\ncontent`, or the content alone when there is no subject.
pub fn format_message(subject: &str, content: &str) -> String {
    if subject.is_empty() {
        content.to_string()
    } else {
        format!("*{}*\n\n{}", subject, content)
    }
}

/// Best-effort numeric scan: skips leading whitespace, accepts an optional sign,
/// then reads digits until the first non-digit. Anything unparseable yields 0,
/// which the Bot API rejects.
pub fn parse_chat_id(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };

    match digits.parse::<i64>() {
        Ok(id) if negative => -id,
        Ok(id) => id,
        Err(_) => 0,
    }
}
