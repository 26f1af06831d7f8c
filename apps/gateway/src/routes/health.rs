use axum::Json;
use serde::Serialize;

use crate::llm_client::MODEL;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model: &'static str,
}

/// GET /health
/// Liveness only; the model API and the browser are not checked.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "resume-gateway",
        version: env!("CARGO_PKG_VERSION"),
        model: MODEL,
    })
}
