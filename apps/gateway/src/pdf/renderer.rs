//! Headless-browser PDF rendering.
//!
//! `ChromiumRenderer` writes the HTML to a private temp directory, runs
//! Chromium's `--print-to-pdf` against it and reads the result back. Renders
//! are bounded by a semaphore and a timeout; the child is killed when the
//! timeout fires. Every document gets a restrictive Content-Security-Policy
//! before it reaches the browser.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;

/// Blocks every subresource load except inline styles and `data:` images and
/// fonts, so a document cannot pull in local files or internal URLs.
const CONTENT_POLICY: &str = "<meta http-equiv=\"Content-Security-Policy\" \
    content=\"default-src 'none'; style-src 'unsafe-inline'; img-src data:; font-src data:\">";

static HEAD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("head pattern compiles"));

const PRINT_STYLES: &str = "<style>@page { size: A4; margin: 0; } \
    html, body { -webkit-print-color-adjust: exact; print-color-adjust: exact; }</style>";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Spawn(std::io::Error),

    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("browser output is not a PDF")]
    NotPdf,

    #[error("renderer is shutting down")]
    Unavailable,
}

/// Carried in `AppState` as `Arc<dyn PdfRenderer>`.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct ChromiumRenderer {
    chrome_path: String,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ChromiumRenderer {
    pub fn new(chrome_path: String, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            chrome_path,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.chrome_path.clone(),
            config.pdf_render_timeout,
            config.max_concurrent_renders,
        )
    }

    fn command(&self, workdir: &Path, html_path: &Path, pdf_path: &Path) -> Command {
        let mut cmd = Command::new(&self.chrome_path);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg("--no-pdf-header-footer")
            .arg("--run-all-compositor-stages-before-draw")
            .arg("--virtual-time-budget=5000")
            .arg(format!("--user-data-dir={}", workdir.join("profile").display()))
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(format!("file://{}", html_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RenderError::Unavailable)?;

        let workdir = tempfile::tempdir()?;
        let html_path = workdir.path().join("resume.html");
        let pdf_path = workdir.path().join("resume.pdf");
        tokio::fs::write(&html_path, prepare_document(html).as_bytes()).await?;

        let child = self
            .command(workdir.path(), &html_path, &pdf_path)
            .spawn()
            .map_err(RenderError::Spawn)?;

        debug!(html_bytes = html.len(), "Launched headless browser");

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                // Dropping the future drops the child, and kill_on_drop reaps it.
                warn!("PDF render timed out after {:?}", self.timeout);
                return Err(RenderError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: tail,
            });
        }

        let pdf = tokio::fs::read(&pdf_path).await?;
        if !is_pdf(&pdf) {
            return Err(RenderError::NotPdf);
        }

        debug!(pdf_bytes = pdf.len(), "PDF render complete");
        Ok(pdf)
    }
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Locks the document down with `CONTENT_POLICY` and adds the default A4
/// print stylesheet unless the document declares its own `@page` rule.
pub fn prepare_document(html: &str) -> String {
    let mut head = String::from(CONTENT_POLICY);
    if !html.to_ascii_lowercase().contains("@page") {
        head.push_str(PRINT_STYLES);
    }

    match HEAD_TAG.find(html) {
        Some(tag) => {
            let mut out = String::with_capacity(html.len() + head.len());
            out.push_str(&html[..tag.end()]);
            out.push_str(&head);
            out.push_str(&html[tag.end()..]);
            out
        }
        None => format!("{head}{html}"),
    }
}
