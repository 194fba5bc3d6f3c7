use axum::Json;

use crate::models::HealthResponse;

/// `GET /v1/health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: gatekeep_core::version().into(),
    })
}
