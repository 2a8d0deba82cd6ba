// src/server.rs

//! HTTP interface.
//!
//! - `GET|POST /readings` with an optional JSON body `{"date": ...}`
//! - `GET /health`

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ReadingsCollection;
use crate::services::ReadingsService;

/// Body of a readings request.
#[derive(Debug, Default, Deserialize)]
pub struct ReadingsRequest {
    /// Any JSON value; see [`crate::utils::date`] for what parses
    #[serde(default)]
    pub date: Option<Value>,
}

/// Build the application router.
pub fn router(service: Arc<ReadingsService>) -> Router {
    Router::new()
        .route("/readings", get(readings).post(readings))
        .route("/health", get(health))
        .with_state(service)
}

/// Bind `bind_addr` and serve until `shutdown` resolves.
pub async fn run(
    bind_addr: &str,
    service: Arc<ReadingsService>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn readings(
    State(service): State<Arc<ReadingsService>>,
    body: Bytes,
) -> Result<Json<ReadingsCollection>> {
    let request = parse_request(&body)?;
    let collection = service.serve(request.date.as_ref()).await.inspect_err(|e| {
        if !e.status_code().is_client_error() {
            log::error!("Readings request failed: {}", e);
        }
    })?;
    Ok(Json(collection))
}

async fn health() -> &'static str {
    "ok"
}

fn parse_request(body: &[u8]) -> Result<ReadingsRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReadingsRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))
}
