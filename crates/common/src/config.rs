use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Kafka bootstrap servers (comma separated)
    pub kafka_bootstrap_servers: String,

    /// Topic carrying inbound notification requests
    pub kafka_topic: String,

    /// Consumer group used for offset tracking
    pub kafka_group_id: String,

    /// Interval between automatic offset commits (default: 5000)
    pub kafka_auto_commit_interval_ms: u64,

    /// Upper bound on a single poll so the loop can observe cancellation (default: 100)
    pub consumer_poll_timeout_ms: u64,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Table holding notification records (default: "notifications")
    pub notifications_table: String,

    /// SendGrid API key for email delivery
    pub sendgrid_api_key: Option<String>,

    /// Email sender address
    pub sendgrid_from_email: Option<String>,

    /// Email sender display name
    pub sendgrid_from_name: String,

    /// Telegram bot token
    pub telegram_bot_token: Option<String>,

    /// Port for the inspection API
    pub api_port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let notifications_table =
            std::env::var("NOTIFICATIONS_TABLE").unwrap_or_else(|_| "notifications".to_string());
        if !is_valid_identifier(&notifications_table) {
            anyhow::bail!("NOTIFICATIONS_TABLE must be a plain SQL identifier");
        }

        Ok(Self {
            kafka_bootstrap_servers: std::env::var("KAFKA_BOOTSTRAP_SERVERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            kafka_topic: std::env::var("KAFKA_TOPIC")
                .unwrap_or_else(|_| "notifications".to_string()),
            kafka_group_id: std::env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| "notification-service".to_string()),
            kafka_auto_commit_interval_ms: std::env::var("KAFKA_AUTO_COMMIT_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("KAFKA_AUTO_COMMIT_INTERVAL_MS must be a valid u64")
                })?,
            consumer_poll_timeout_ms: std::env::var("CONSUMER_POLL_TIMEOUT_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CONSUMER_POLL_TIMEOUT_MS must be a valid u64"))?,
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            notifications_table,
            sendgrid_api_key: non_empty_var("SENDGRID_API_KEY"),
            sendgrid_from_email: non_empty_var("SENDGRID_FROM_EMAIL"),
            sendgrid_from_name: std::env::var("SENDGRID_FROM_NAME")
                .unwrap_or_else(|_| "Notification Service".to_string()),
            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_PORT must be a valid u16"))?,
        })
    }
}

/// An unset variable and an empty one both mean "not configured".
fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// The table name is interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
