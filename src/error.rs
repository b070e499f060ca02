use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telegram API error: {0}")]
    TelegramApi(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Malformed or missing markup in the source page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("page container `{0}` not found")]
    MissingContainer(String),

    #[error("station block {index}: missing {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
}

/// A subscription command issued out of order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("no station selected")]
    NoStationSelected,

    #[error("not subscribed")]
    NotSubscribed,

    #[error("unknown station `{0}`")]
    UnknownStation(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery to {recipient} failed: {message}")]
    Failed { recipient: i64, message: String },

    #[error("delivery to {recipient} timed out")]
    Timeout { recipient: i64 },
}

impl DeliveryError {
    pub fn failed(recipient: i64, message: impl std::fmt::Display) -> Self {
        Self::Failed {
            recipient,
            message: message.to_string(),
        }
    }
}
