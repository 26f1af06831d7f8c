//! Axum route handler for PDF export.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pdf::crypto::decrypt_html;
use crate::pdf::models::{sanitize_filename, validate_html, PdfRequest, PdfResponse};
use crate::security::client_ip::client_ip;
use crate::security::signature::verify_request;
use crate::state::AppState;

/// POST /api/generate-pdf
///
/// Signature → parse → rate limit → decrypt and validate → render.
pub async fn handle_generate_pdf(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PdfResponse>, AppError> {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));

    verify_request(&state.config, &headers, &body)?;

    let request: PdfRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;

    state.limiters.pdf_ip.check(&ip)?;

    let html = decrypt_html(&state.config.pdf_encryption_key, &request.html).map_err(|e| {
        warn!(ip = %ip, "PDF payload rejected: {e}");
        AppError::from(e)
    })?;
    validate_html(&html).map_err(AppError::Validation)?;

    let filename = sanitize_filename(request.filename.as_deref());
    let render_id = Uuid::new_v4();
    info!(%render_id, ip = %ip, html_bytes = html.len(), "Rendering PDF");

    let started = Instant::now();
    let pdf = state.renderer.render(&html).await?;

    info!(
        %render_id,
        pdf_bytes = pdf.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "PDF rendered"
    );

    Ok(Json(PdfResponse {
        size: pdf.len(),
        pdf: STANDARD.encode(&pdf),
        filename,
    }))
}
