//! Liveness endpoint.

use crate::{AppState, Error};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use log::*;

/// GET /health
///
/// Answers 200 while the database connection is usable.
pub async fn health_check(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    if let Err(e) = app_state.db_conn_ref().ping().await {
        warn!("Health check failed to ping the database: {e}");
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded" })),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    ))
}
