use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or empty.
#[derive(Clone)]
pub struct Config {
    pub request_signing_secret: String,
    pub pdf_encryption_key: String,
    pub anthropic_api_key: String,
    pub allowed_origins: Vec<String>,
    pub signature_tolerance: Duration,
    pub enhance_rate_limit_per_minute: u32,
    pub enhance_field_rate_limit_per_minute: u32,
    pub pdf_rate_limit_per_minute: u32,
    pub chrome_path: String,
    pub pdf_render_timeout: Duration,
    pub max_concurrent_renders: usize,
    pub max_body_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Config {
            request_signing_secret: require(&lookup, "REQUEST_SIGNING_SECRET")?,
            pdf_encryption_key: require(&lookup, "PDF_ENCRYPTION_KEY")?,
            anthropic_api_key: require(&lookup, "ANTHROPIC_API_KEY")?,
            allowed_origins: parse_origins(&origins),
            signature_tolerance: Duration::from_secs(parse_or(
                &lookup,
                "SIGNATURE_TOLERANCE_SECS",
                300,
            )?),
            enhance_rate_limit_per_minute: parse_or(&lookup, "ENHANCE_RATE_LIMIT_PER_MINUTE", 10)?,
            enhance_field_rate_limit_per_minute: parse_or(
                &lookup,
                "ENHANCE_FIELD_RATE_LIMIT_PER_MINUTE",
                5,
            )?,
            pdf_rate_limit_per_minute: parse_or(&lookup, "PDF_RATE_LIMIT_PER_MINUTE", 5)?,
            chrome_path: lookup("CHROME_PATH").unwrap_or_else(|| "chromium".to_string()),
            pdf_render_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PDF_RENDER_TIMEOUT_SECS",
                30,
            )?),
            max_concurrent_renders: parse_or(&lookup, "MAX_CONCURRENT_RENDERS", 2)?,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", 4 * 1024 * 1024)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("request_signing_secret", &"<redacted>")
            .field("pdf_encryption_key", &"<redacted>")
            .field("anthropic_api_key", &"<redacted>")
            .field("allowed_origins", &self.allowed_origins)
            .field("signature_tolerance", &self.signature_tolerance)
            .field(
                "enhance_rate_limit_per_minute",
                &self.enhance_rate_limit_per_minute,
            )
            .field(
                "enhance_field_rate_limit_per_minute",
                &self.enhance_field_rate_limit_per_minute,
            )
            .field("pdf_rate_limit_per_minute", &self.pdf_rate_limit_per_minute)
            .field("chrome_path", &self.chrome_path)
            .field("pdf_render_timeout", &self.pdf_render_timeout)
            .field("max_concurrent_renders", &self.max_concurrent_renders)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

/// Splits a comma-separated origin list, normalising case and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_ascii_lowercase())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        request_signing_secret: "test-signing-secret".to_string(),
        pdf_encryption_key: "test-encryption-key".to_string(),
        anthropic_api_key: "test-api-key".to_string(),
        allowed_origins: vec!["https://resume.example.com".to_string()],
        signature_tolerance: Duration::from_secs(300),
        enhance_rate_limit_per_minute: 10,
        enhance_field_rate_limit_per_minute: 5,
        pdf_rate_limit_per_minute: 5,
        chrome_path: "chromium".to_string(),
        pdf_render_timeout: Duration::from_secs(30),
        max_concurrent_renders: 2,
        max_body_bytes: 4 * 1024 * 1024,
        port: 8080,
        rust_log: "info".to_string(),
    }
}
