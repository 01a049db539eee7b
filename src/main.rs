#![forbid(unsafe_code)]

//! `odk-odoo-bridge` — ODK webhook receiver binary.
//!
//! Bootstraps configuration, opens the Odoo JSON-RPC session, and serves
//! the webhook endpoints until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use odk_odoo_bridge::config::GlobalConfig;
use odk_odoo_bridge::gateway::odoo::OdooGateway;
use odk_odoo_bridge::gateway::RemoteStore;
use odk_odoo_bridge::pipeline::SavePipeline;
use odk_odoo_bridge::server::{serve_http, AppState};
use odk_odoo_bridge::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "odk-odoo-bridge", about = "ODK to Odoo submission bridge", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the listen port from the config file.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("odk-odoo-bridge bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }

    // A missing password leaves the service up in degraded mode.
    if let Err(err) = config.load_credentials().await {
        warn!(%err, "backend password unavailable; backend calls will fail");
    }

    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Open backend session ────────────────────────────
    let gateway = OdooGateway::new(&config.backend)?;
    match gateway.login().await {
        Ok(uid) => info!(uid, endpoint = gateway.endpoint(), "backend login succeeded"),
        Err(err) => error!(%err, endpoint = gateway.endpoint(), "backend login failed; running degraded"),
    }
    match gateway.server_version().await {
        Ok(version) => info!(%version, "backend reachable"),
        Err(err) => warn!(%err, "backend health check failed"),
    }

    let store: Arc<dyn RemoteStore> = Arc::new(gateway);
    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        pipeline: SavePipeline::new(store),
    });

    // ── Serve ───────────────────────────────────────────
    let ct = CancellationToken::new();
    let http_ct = ct.clone();
    let http_state = Arc::clone(&state);
    let http_handle = tokio::spawn(async move {
        if let Err(err) = serve_http(http_state, http_ct).await {
            error!(%err, "http server failed");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = http_handle.await;
    info!("odk-odoo-bridge shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
