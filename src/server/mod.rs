//! HTTP service
//!
//! JSON API over every collection in the catalog:
//! - `GET /healthz`, `GET /readyz`
//! - `GET /api/collections`
//! - `GET|POST /api/{collection}`
//! - `GET|PUT|DELETE /api/{collection}/{id}`
//! - `POST /api/{collection}/bulk`
//!
//! Every error response is `{"success": false, "error": "..."}`.

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::Router;
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// The application router with its state attached
pub fn router(state: AppState) -> Router {
    routes::router().with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve_on(state, listener).await
}

/// Serve on an already bound listener
pub async fn serve_on(state: AppState, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;
    log::info!(
        "Listening on {} ({} collection(s))",
        addr.to_string().cyan(),
        state.catalog.count()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
