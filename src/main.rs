mod api;
mod aqi;
mod chat;
mod config;
mod constants;
mod dashboard;
mod http_client;
mod netcdf;
mod pages;
mod series;
mod sources;
mod types;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::chat::{GroqChat, ResponseFormatter};
use crate::config::Config;
use crate::http_client::build_client;
use crate::sources::Sources;
use crate::types::AppState;
use crate::utils::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Arc::new(Config::from_env()?);
    let http = build_client()?;

    if cfg.groq_api_key.is_none() {
        info!("GROQ_API_KEY not set, chat answers will be built from the reading");
    }
    if cfg.earthdata_token.is_none() {
        info!("EARTHDATA_TOKEN not set, NO2 will be estimated and rainfall omitted");
    }

    let state = AppState {
        cfg: cfg.clone(),
        sources: Arc::new(Sources::live(&cfg, http.clone())),
        chat: Arc::new(GroqChat::new(http, &cfg)),
        formatter: Arc::new(ResponseFormatter::new()?),
    };

    let app = api::router(state);
    let listen_addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    info!("Air quality dashboard listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
