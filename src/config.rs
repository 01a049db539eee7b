//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which the backend password is stored.
pub const KEYRING_SERVICE: &str = "odk-odoo-bridge";

/// Environment variable consulted when the keychain has no password.
pub const PASSWORD_ENV_VAR: &str = "ODOO_PASSWORD";

/// Connection settings for the Odoo JSON-RPC backend.
///
/// The password is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// `http` or `https`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Backend host name or address.
    pub host: String,
    /// Backend port.
    #[serde(default = "default_backend_port")]
    pub port: u16,
    /// Odoo database name.
    pub database: String,
    /// Login used for the RPC session.
    pub username: String,
    /// Per-request timeout; 0 means no timeout.
    #[serde(default)]
    pub request_timeout_seconds: u64,
    /// Backend password (populated at runtime).
    #[serde(skip)]
    pub password: String,
}

impl BackendConfig {
    /// Full URL of the JSON-RPC endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}/jsonrpc", self.protocol, self.host, self.port)
    }

    /// Request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_seconds > 0).then(|| Duration::from_secs(self.request_timeout_seconds))
    }
}

fn default_protocol() -> String {
    "http".into()
}

fn default_backend_port() -> u16 {
    8069
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8000
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the webhook listener binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Port the webhook listener binds to.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Odoo backend connectivity settings.
    pub backend: BackendConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the backend password from OS keychain with env-var fallback.
    ///
    /// Tries the `odk-odoo-bridge` keyring service first (entry named after
    /// the configured database), then falls back to `ODOO_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides a password.
    pub async fn load_credentials(&mut self) -> Result<()> {
        let entry = format!("{}@{}", self.backend.username, self.backend.database);
        self.backend.password = load_credential(&entry, PASSWORD_ENV_VAR).await?;
        Ok(())
    }

    /// Socket address string the HTTP listener binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.backend.protocol.as_str(), "http" | "https") {
            return Err(AppError::Config(format!(
                "backend.protocol must be http or https, got {}",
                self.backend.protocol
            )));
        }

        if self.backend.host.trim().is_empty() {
            return Err(AppError::Config("backend.host must not be empty".into()));
        }

        if self.backend.database.trim().is_empty() {
            return Err(AppError::Config("backend.database must not be empty".into()));
        }

        if self.backend.username.trim().is_empty() {
            return Err(AppError::Config("backend.username must not be empty".into()));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
