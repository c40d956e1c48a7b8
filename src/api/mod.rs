//! HTTP adapter
//!
//! Exposes the ingestion engine and the body accumulators over axum, the way a
//! service embedding this crate would.

use crate::{IngestConfig, Result};
use axum::{Router, routing::post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router with all route definitions
///
/// # Routes
///
/// - `POST /multipart/disk` - Parse a form in disk mode, report the part
///   count, then delete the stored files
/// - `POST /multipart/memory` - Parse a form in memory mode, report the part
///   count
/// - `POST /upload` - Accumulate a raw body, preallocating from
///   `Content-Length` and refusing lengths over `upload_limit`
/// - `POST /body` - Parse a limited `text/plain`, JSON or raw body and echo it
pub fn create_router(config: Arc<IngestConfig>) -> Router {
    let state = AppState::new(config);

    Router::new()
        .route("/multipart/disk", post(routes::multipart_disk))
        .route("/multipart/memory", post(routes::multipart_memory))
        .route("/upload", post(routes::upload))
        .route("/body", post(routes::echo_body))
        .with_state(state)
}

/// Serve the router on `bind_address` until the server stops.
///
/// # Example
///
/// ```no_run
/// use form_ingest::IngestConfig;
/// use std::sync::Arc;
///
/// # async fn example() -> form_ingest::Result<()> {
/// let config = Arc::new(IngestConfig::default());
/// form_ingest::api::start_api_server(config, "127.0.0.1:8080".parse().unwrap()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(config: Arc<IngestConfig>, bind_address: SocketAddr) -> Result<()> {
    config.validate()?;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(config);
    let listener = TcpListener::bind(bind_address).await?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app).await?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
