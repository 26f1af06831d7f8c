//! Axum route handler for the enhancement API.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use tracing::warn;

use crate::enhance::enhancer::enhance_text;
use crate::enhance::models::{EnhanceRequest, EnhanceResponse};
use crate::errors::AppError;
use crate::security::client_ip::client_ip;
use crate::security::origin::is_allowed_origin;
use crate::security::signature::verify_request;
use crate::state::AppState;

/// POST /api/enhance
///
/// Origin check → signature → parse → rate limit → enhancement pipeline.
/// The body is taken as raw bytes because the signature covers them exactly.
pub async fn handle_enhance(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EnhanceResponse>, AppError> {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));

    if !is_allowed_origin(&headers, &state.config.allowed_origins) {
        warn!(ip = %ip, "Enhancement request from disallowed origin");
        return Err(AppError::Forbidden);
    }

    verify_request(&state.config, &headers, &body)?;

    let request: EnhanceRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;

    state.limiters.check_enhance(ip, request.field)?;

    let enhanced = enhance_text(state.generator.as_ref(), request.field, &request.text).await?;

    Ok(Json(EnhanceResponse {
        field: request.field,
        enhanced,
    }))
}
