use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FILENAME: &str = "resume.pdf";

/// Decrypted documents above this size are refused before rendering.
pub const MAX_HTML_BYTES: usize = 2 * 1024 * 1024;

const MAX_FILENAME_CHARS: usize = 100;

static MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z!/][^>]*>").expect("markup pattern compiles"));

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PdfRequest {
    /// base64(nonce || ciphertext || tag), see `pdf::crypto`.
    pub html: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PdfResponse {
    /// base64-encoded PDF bytes.
    pub pdf: String,
    pub filename: String,
    /// Size of the decoded PDF in bytes.
    pub size: usize,
}

/// Checks the decrypted document before it is handed to the browser.
pub fn validate_html(html: &str) -> Result<(), String> {
    if html.len() > MAX_HTML_BYTES {
        return Err(format!(
            "Document exceeds the maximum size of {} bytes",
            MAX_HTML_BYTES
        ));
    }
    if html.trim().is_empty() || !MARKUP.is_match(html) {
        return Err("Document does not contain HTML markup".to_string());
    }
    Ok(())
}

/// Restricts the download name to `[A-Za-z0-9._-]` and a `.pdf` suffix.
pub fn sanitize_filename(requested: Option<&str>) -> String {
    let Some(raw) = requested else {
        return DEFAULT_FILENAME.to_string();
    };

    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect();

    let stem = if cleaned.to_ascii_lowercase().ends_with(".pdf") {
        &cleaned[..cleaned.len() - 4]
    } else {
        cleaned.as_str()
    };
    // No hidden files or path-like names.
    let stem = stem.trim_start_matches('.').trim_end_matches('.');

    if !stem.chars().any(|c| c.is_ascii_alphanumeric()) {
        return DEFAULT_FILENAME.to_string();
    }

    format!("{stem}.pdf")
}
