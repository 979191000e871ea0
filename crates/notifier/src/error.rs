use thiserror::Error;

/// A sender could not be built from the supplied credentials.
///
/// Raised once at startup; the affected channel stays disabled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SendGrid API key must be provided")]
    MissingSendGridApiKey,

    #[error("SendGrid sender email must be provided")]
    MissingSenderEmail,

    #[error("Telegram bot token must be provided")]
    MissingBotToken,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A single delivery attempt failed.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("{0}")]
    InvalidDestination(&'static str),

    #[error("failed to send email, status code: {status}, body: {body}")]
    Rejected { status: u16, body: String },

    #[error("telegram API error: {0}")]
    Api(String),

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
