//! Local HTTP API over the release cache.
//!
//! Indexing runs in the background: `POST /api/index` returns as soon as the
//! run is accepted, and `GET /api/index/status` reports its progress.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - API request/response types (DTOs)

mod handlers;
mod models;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use color_eyre::eyre::Result;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use ordiff_core::{DeltaStore, IndexService};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state for the server.
pub struct AppState {
    /// Starts and tracks indexing runs.
    pub service: IndexService,
    /// Cache the comparison endpoints read from.
    pub store: Arc<dyn DeltaStore>,
    /// File holding the default repository.
    pub settings_path: PathBuf,
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the HTTP API.
pub struct ServeConfig {
    /// Port to listen on.
    pub port: u16,
    /// File holding the default repository.
    pub settings_path: PathBuf,
}

// =============================================================================
// Server Entry Point
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/index", post(handlers::start_index))
        .route("/api/index/status", get(handlers::index_status))
        .route("/api/releases", get(handlers::list_releases))
        .route("/api/compare", get(handlers::compare_releases))
        .route("/api/summary", get(handlers::summarize))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Start the HTTP API and serve until the process is stopped.
pub async fn start_server(config: ServeConfig, service: IndexService) -> Result<()> {
    let state = Arc::new(AppState {
        store: Arc::clone(service.indexer().store()),
        service,
        settings_path: config.settings_path,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    println!("ordiff API listening on http://localhost:{}", config.port);
    println!("Press Ctrl+C to stop\n");
    info!(%addr, "Starting HTTP API");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
