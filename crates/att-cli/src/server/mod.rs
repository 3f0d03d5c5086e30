//! HTTP API over the attendance store.
//!
//! Routes:
//!
//! - `POST /api/detect` records a beacon detection (`/api/esp32/detect` is kept
//!   for deployed firmware).
//! - `GET /api/attendance` lists events, optionally annotated.
//! - `GET /api/attendance/summary` returns daily summaries.
//! - `GET /api/attendance/stats` returns today's counters.
//! - `GET /api/attendance/export` downloads the CSV export.
//! - `GET /api/employees/:id/attendance` lists one employee's events.

mod handlers;
mod response;
mod state;

pub use handlers::create_router;
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;

/// Binds `address` and serves the API until Ctrl-C.
pub async fn serve(state: AppState, address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    let local: SocketAddr = listener.local_addr()?;
    info!(address = %local, "serving attendance API");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
