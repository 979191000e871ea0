//! Email delivery through the SendGrid v3 mail API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use courier_common::types::NotificationRecord;

use crate::error::{ConfigError, SendError};
use crate::sender::ChannelSender;

const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

/// Name + address pair used for both sender and recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A fully composed single-recipient email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Raw provider response, inspected by the sender for the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

/// Transport for composed emails.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<ProviderResponse, SendError>;
}

#[derive(Debug, Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization<'a> {
    to: [&'a Mailbox; 1],
}

#[derive(Debug, Serialize)]
struct SendGridMail<'a> {
    personalizations: [SendGridPersonalization<'a>; 1],
    from: &'a Mailbox,
    subject: &'a str,
    content: [SendGridContent<'a>; 2],
}

impl<'a> SendGridMail<'a> {
    fn from_message(message: &'a EmailMessage) -> Self {
        Self {
            personalizations: [SendGridPersonalization { to: [&message.to] }],
            from: &message.from,
            subject: &message.subject,
            content: [
                SendGridContent {
                    content_type: "text/plain",
                    value: &message.text,
                },
                SendGridContent {
                    content_type: "text/html",
                    value: &message.html,
                },
            ],
        }
    }
}

/// SendGrid HTTP client.
pub struct SendGridClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SendGridClient {
    pub fn new(api_key: &str) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, SENDGRID_API_BASE)
    }

    /// Point the client at a different API host (sandbox or local stub).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingSendGridApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EmailProvider for SendGridClient {
    async fn send(&self, message: &EmailMessage) -> Result<ProviderResponse, SendError> {
        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SendGridMail::from_message(message))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(ProviderResponse { status, body })
    }
}

/// Email channel sender.
pub struct EmailSender {
    provider: Arc<dyn EmailProvider>,
    from: Mailbox,
}

impl EmailSender {
    /// Build a sender over an arbitrary provider. A source address is mandatory.
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        from_email: &str,
        from_name: &str,
    ) -> Result<Self, ConfigError> {
        if from_email.trim().is_empty() {
            return Err(ConfigError::MissingSenderEmail);
        }

        Ok(Self {
            provider,
            from: Mailbox {
                email: from_email.to_string(),
                name: (!from_name.is_empty()).then(|| from_name.to_string()),
            },
        })
    }

    /// Build a sender backed by SendGrid.
    pub fn sendgrid(api_key: &str, from_email: &str, from_name: &str) -> Result<Self, ConfigError> {
        let client = SendGridClient::new(api_key)?;
        Self::new(Arc::new(client), from_email, from_name)
    }

    /// Compose the outgoing message; subject and content are used as-is, with the
    /// content doubling as both the plain-text and the HTML body.
    pub fn compose(&self, record: &NotificationRecord) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: Mailbox {
                email: record.channel.clone(),
                name: None,
            },
            subject: record.subject.clone(),
            text: record.content.clone(),
            html: record.content.clone(),
        }
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(&self, record: &NotificationRecord) -> Result<(), SendError> {
        if record.channel.trim().is_empty() {
            return Err(SendError::InvalidDestination(
                "email address must be provided",
            ));
        }

        let message = self.compose(record);
        let response = self.provider.send(&message).await?;

        if response.status >= 400 {
            return Err(SendError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        tracing::debug!(to = %record.channel, status = response.status, "Email accepted by provider");
        Ok(())
    }
}
