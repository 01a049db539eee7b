//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Inbound submission body is empty or not a JSON object.
    Input(String),
    /// Backend JSON-RPC call failed or returned an error envelope.
    Rpc(String),
    /// Backend rejected the configured credentials.
    Unauthorized(String),
    /// Requested backend record does not exist.
    NotFound(String),
    /// HTTP transport failure talking to the backend.
    Http(String),
    /// File-system or socket I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Input(msg) => write!(f, "input: {msg}"),
            Self::Rpc(msg) => write!(f, "rpc: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Message without the category prefix, suitable for API responses.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Input(msg)
            | Self::Rpc(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Http(msg)
            | Self::Io(msg) => msg,
        }
    }

    /// Whether the failure means the cached backend session may be stale.
    #[must_use]
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Unauthorized(_))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Input(format!("invalid json: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
