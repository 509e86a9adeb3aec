//! HTTP API endpoint handlers.

use axum::Json;

use crate::infrastructure::dto::http::HealthResponse;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
