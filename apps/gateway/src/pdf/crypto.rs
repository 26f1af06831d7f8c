//! Decryption of the resume HTML sent for PDF export.
//!
//! Payload: standard base64 of `nonce (12 bytes) || ciphertext || tag (16 bytes)`,
//! sealed with AES-256-GCM under `SHA-256(PDF_ENCRYPTION_KEY)`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("payload is not valid base64")]
    Encoding,

    #[error("payload is too short to contain a nonce and tag")]
    Truncated,

    #[error("payload failed authentication")]
    Authentication,

    #[error("decrypted payload is not UTF-8")]
    NotUtf8,

    #[error("encryption failed")]
    Encryption,
}

fn cipher(passphrase: &str) -> Aes256Gcm {
    let digest = Sha256::digest(passphrase.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
}

/// Seals `html` for transport. Used by clients and tests.
#[allow(dead_code)]
pub fn encrypt_html(passphrase: &str, html: &str) -> Result<String, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher(passphrase)
        .encrypt(&nonce, html.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(payload))
}

pub fn decrypt_html(passphrase: &str, payload: &str) -> Result<String, CryptoError> {
    let raw = STANDARD
        .decode(payload.trim())
        .map_err(|_| CryptoError::Encoding)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Truncated);
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let plaintext = cipher(passphrase)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)
}
