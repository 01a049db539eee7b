//! HTTP surface for the ODK webhook.
//!
//! Routes:
//! - `GET /`: service banner.
//! - `GET /health`: liveness, plain `ok`.
//! - `GET /health/backend`: backend reachability and version.
//! - `POST /odk`: one form submission; runs the save pipeline.
//! - `GET /odk/submissions/{id}`: read back an archived submission.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::gateway::RecordId;
use crate::models::response::{ApiResponse, ResponseStatus};
use crate::pipeline::{fetch_submission, SavePipeline};
use crate::{AppError, Result};

/// Banner returned by `GET /`.
pub const BANNER: &str = "Odoo-ODK(Open Data Kit) processor";

/// State shared by every request handler.
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// Save pipeline wired to the backend store.
    pub pipeline: SavePipeline,
}

async fn banner() -> &'static str {
    BANNER
}

/// Handler for `GET /health`: returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

async fn backend_health(State(state): State<Arc<AppState>>) -> ApiResponse {
    match state.pipeline.store().server_version().await {
        Ok(version) => ApiResponse::success(
            "Backend reachable",
            Some(json!({ "server_version": version })),
        ),
        Err(err) => {
            warn!(%err, "backend health check failed");
            ApiResponse {
                code: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                status: ResponseStatus::Error,
                message: err.message().to_owned(),
                data: None,
            }
        }
    }
}

async fn receive_submission(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResponse {
    info!(bytes = body.len(), "submission received");
    state.pipeline.process(&body).await
}

async fn read_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RecordId>,
) -> ApiResponse {
    fetch_submission(state.pipeline.store().as_ref(), id).await
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/health/backend", get(backend_health))
        .route("/odk", post(receive_submission))
        .route("/odk/submissions/{id}", get(read_submission))
        .with_state(state)
}

/// Serve the router on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails while running.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("listener has no local address: {err}")))?;
    info!(%addr, "starting ODK webhook listener");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("http server error: {err}")))?;

    info!("ODK webhook listener shut down");
    Ok(())
}

/// Bind `config.http_host:config.http_port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the address cannot be bound.
pub async fn serve_http(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = state.config.bind_address();
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;
    serve_on(listener, state, ct).await
}
