//! HMAC-SHA256 request signatures.
//!
//! The frontend signs `"{timestamp}.{body}"` with the shared signing secret and
//! sends the result in `X-Signature` (lowercase hex) alongside `X-Timestamp`
//! (unix epoch milliseconds). A request is accepted only when the MAC matches
//! and the timestamp lies within the configured tolerance of server time.

use std::time::Duration;

use axum::http::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Length of a hex-encoded SHA-256 MAC.
const SIGNATURE_HEX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing x-signature header")]
    MissingSignature,

    #[error("missing x-timestamp header")]
    MissingTimestamp,

    #[error("signature is not 64 hex characters")]
    MalformedSignature,

    #[error("timestamp is not a unix millisecond value")]
    MalformedTimestamp,

    #[error("timestamp outside tolerance ({skew_ms}ms skew)")]
    Expired { skew_ms: i64 },

    #[error("signature mismatch")]
    Mismatch,
}

/// Computes the hex signature for a body sent at `timestamp_ms`.
pub fn sign(secret: &[u8], timestamp_ms: i64, body: &[u8]) -> String {
    hex::encode(compute_mac(secret, &timestamp_ms.to_string(), body))
}

/// Verifies the signature headers of a request against its raw body.
pub fn verify(
    secret: &[u8],
    headers: &HeaderMap,
    body: &[u8],
    now_ms: i64,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let signature = header_str(headers, SIGNATURE_HEADER).ok_or(SignatureError::MissingSignature)?;
    let timestamp = header_str(headers, TIMESTAMP_HEADER).ok_or(SignatureError::MissingTimestamp)?;

    // The MAC covers the header text as sent, not its re-formatted value.
    let timestamp = timestamp.trim();
    let timestamp_ms: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedTimestamp)?;

    let signature = signature.trim();
    if signature.len() != SIGNATURE_HEX_LEN {
        return Err(SignatureError::MalformedSignature);
    }
    let provided = hex::decode(signature).map_err(|_| SignatureError::MalformedSignature)?;

    let skew_ms = now_ms.saturating_sub(timestamp_ms);
    let tolerance_ms = i64::try_from(tolerance.as_millis()).unwrap_or(i64::MAX);
    if skew_ms.unsigned_abs() > tolerance_ms.unsigned_abs() {
        return Err(SignatureError::Expired { skew_ms });
    }

    let expected = compute_mac(secret, timestamp, body);
    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Verifies a request against the configured secret and tolerance at the
/// current wall-clock time.
pub fn verify_request(config: &Config, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
    verify(
        config.request_signing_secret.as_bytes(),
        headers,
        body,
        Utc::now().timestamp_millis(),
        config.signature_tolerance,
    )
}

fn compute_mac(secret: &[u8], timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
