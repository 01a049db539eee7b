//! Odoo JSON-RPC gateway.
//!
//! Speaks the `/jsonrpc` endpoint: `common.login` establishes a session
//! uid, `object.execute_kw` performs model calls. The uid is cached and
//! dropped whenever a call fails in a way that suggests the session is
//! stale, so the next call logs in again. Failed calls are never retried.

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{to_domain, Condition, Payload, RecordId, RemoteStore, StoreFuture};
use crate::config::BackendConfig;
use crate::{AppError, Result};

/// Authenticated JSON-RPC client for one Odoo database.
pub struct OdooGateway {
    http: reqwest::Client,
    endpoint: String,
    database: String,
    username: String,
    password: String,
    uid: Mutex<Option<RecordId>>,
}

impl OdooGateway {
    /// Build a gateway from backend settings without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            uid: Mutex::new(None),
        })
    }

    /// JSON-RPC endpoint this gateway posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Authenticate and cache the session uid.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when the backend rejects the
    /// credentials, or a transport error variant.
    pub async fn login(&self) -> Result<RecordId> {
        let uid = self.authenticate().await?;
        *self.uid.lock().await = Some(uid);
        info!(uid, database = %self.database, "odoo session established");
        Ok(uid)
    }

    /// Whether a session uid is currently cached.
    pub async fn is_authenticated(&self) -> bool {
        self.uid.lock().await.is_some()
    }

    async fn authenticate(&self) -> Result<RecordId> {
        let result = self
            .call(
                "common",
                "login",
                vec![
                    Value::from(self.database.as_str()),
                    Value::from(self.username.as_str()),
                    Value::from(self.password.as_str()),
                ],
            )
            .await?;

        result.as_i64().ok_or_else(|| {
            AppError::Unauthorized(format!(
                "login rejected for {}@{}",
                self.username, self.database
            ))
        })
    }

    async fn session_uid(&self) -> Result<RecordId> {
        if let Some(uid) = *self.uid.lock().await {
            return Ok(uid);
        }

        // The lock is not held across the login round trip; a session
        // stored by a concurrent caller in the meantime wins.
        let uid = self.authenticate().await?;
        let mut guard = self.uid.lock().await;
        if let Some(existing) = *guard {
            return Ok(existing);
        }
        *guard = Some(uid);
        info!(uid, "odoo session re-established");
        Ok(uid)
    }

    async fn invalidate_session(&self) {
        *self.uid.lock().await = None;
    }

    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value> {
        let uid = self.session_uid().await?;
        let result = self
            .call(
                "object",
                "execute_kw",
                vec![
                    Value::from(self.database.as_str()),
                    Value::from(uid),
                    Value::from(self.password.as_str()),
                    Value::from(model),
                    Value::from(method),
                    args,
                    kwargs,
                ],
            )
            .await;

        if let Err(ref err) = result {
            if err.invalidates_session() {
                warn!(%err, model, method, "dropping odoo session after failed call");
                self.invalidate_session().await;
            }
        }
        result
    }

    async fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": {
                "service": service,
                "method": method,
                "args": args,
            },
            "id": Uuid::new_v4().to_string(),
        });

        debug!(service, method, "json-rpc call");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let reply: Value = response.json().await?;

        unwrap_reply(reply)
    }
}

/// Extract `result` from a JSON-RPC reply or convert its `error` member.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for access-denied errors and
/// `AppError::Rpc` for every other error envelope.
pub fn unwrap_reply(mut reply: Value) -> Result<Value> {
    if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
        let data = error.get("data");
        let message = data
            .and_then(|d| d.get("message"))
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown backend error")
            .to_owned();
        let name = data
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        if name.ends_with("AccessDenied") || name.ends_with("AccessError") {
            return Err(AppError::Unauthorized(message));
        }
        return Err(AppError::Rpc(message));
    }

    reply
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| AppError::Rpc("reply carries neither result nor error".into()))
}

fn rows_from(value: Value) -> Result<Vec<Payload>> {
    let Value::Array(items) = value else {
        return Err(AppError::Rpc(format!("expected a list of rows, got {value}")));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect())
}

fn created_id(value: &Value) -> Result<RecordId> {
    value
        .as_i64()
        .or_else(|| value.as_array().and_then(|ids| ids.first()).and_then(Value::as_i64))
        .ok_or_else(|| AppError::Rpc(format!("create returned no record id: {value}")))
}

impl RemoteStore for OdooGateway {
    fn create<'a>(&'a self, model: &'a str, payload: Payload) -> StoreFuture<'a, RecordId> {
        Box::pin(async move {
            let result = self
                .execute_kw(model, "create", json!([payload]), json!({}))
                .await?;
            created_id(&result)
        })
    }

    fn search_read<'a>(
        &'a self,
        model: &'a str,
        conditions: Vec<Condition>,
        fields: &'a [&'a str],
    ) -> StoreFuture<'a, Vec<Payload>> {
        Box::pin(async move {
            let result = self
                .execute_kw(
                    model,
                    "search_read",
                    json!([to_domain(&conditions)]),
                    json!({ "fields": fields }),
                )
                .await?;
            rows_from(result)
        })
    }

    fn read<'a>(
        &'a self,
        model: &'a str,
        ids: Vec<RecordId>,
        fields: &'a [&'a str],
    ) -> StoreFuture<'a, Vec<Payload>> {
        Box::pin(async move {
            let result = self
                .execute_kw(model, "read", json!([ids]), json!({ "fields": fields }))
                .await?;
            rows_from(result)
        })
    }

    fn server_version(&self) -> StoreFuture<'_, String> {
        Box::pin(async move {
            let result = self.call("common", "version", Vec::new()).await?;
            result
                .get("server_version")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| AppError::Rpc("version reply missing server_version".into()))
        })
    }
}
