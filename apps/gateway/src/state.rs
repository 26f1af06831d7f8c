use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::pdf::renderer::PdfRenderer;
use crate::security::rate_limit::Limiters;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Model backend for enhancement. Default: LlmClient.
    pub generator: Arc<dyn TextGenerator>,
    /// PDF backend. Default: ChromiumRenderer, bounded by MAX_CONCURRENT_RENDERS.
    pub renderer: Arc<dyn PdfRenderer>,
    /// In-memory sliding windows; state is lost on restart.
    pub limiters: Arc<Limiters>,
}
