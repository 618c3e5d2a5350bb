use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::repository::IssueRepository;
use super::ws;
use crate::config::DEFAULT_PORT;

/// Configuration for the board server.
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            dev_mode: false,
        }
    }
}

/// Build the full application router with API and WebSocket routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_tx = state.ws_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler(ws_upgrade, ws_tx)),
        )
        .with_state(state)
}

/// Start the board server. The repository is loaded once before binding
/// and closed when the server stops.
pub async fn start_server(config: ServerConfig, repo: Arc<IssueRepository>) -> Result<()> {
    let (ws_tx, _rx) = broadcast::channel::<String>(256);

    match repo.load().await {
        Ok(report) => info!(
            loaded = report.loaded,
            rejected = report.rejected,
            "initial issue load complete"
        ),
        // The board stays up with an empty collection; /api/issues/refresh retries.
        Err(e) => warn!(error = %e, "initial issue load failed"),
    }

    let relay = tokio::spawn(ws::forward_notifications(repo.subscribe(), ws_tx.clone()));

    let state = Arc::new(AppState {
        repo: repo.clone(),
        ws_tx,
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, "issue board running at http://{}", local_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    repo.close();
    relay.abort();
    info!("server shut down gracefully");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
