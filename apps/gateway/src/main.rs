mod config;
mod enhance;
mod errors;
mod llm_client;
mod pdf;
mod routes;
mod security;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pdf::renderer::ChromiumRenderer;
use crate::routes::{build_router, cors_layer};
use crate::security::rate_limit::Limiters;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Allowed origins: {}",
        config.allowed_origins.join(", ")
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize PDF renderer
    let renderer = ChromiumRenderer::from_config(&config);
    info!(
        "PDF renderer: {} (timeout {:?}, {} concurrent)",
        config.chrome_path, config.pdf_render_timeout, config.max_concurrent_renders
    );

    let limiters = Limiters::from_config(&config);

    // Build app state
    let state = AppState {
        config: config.clone(),
        generator: Arc::new(llm),
        renderer: Arc::new(renderer),
        limiters: Arc::new(limiters),
    };

    // Build router
    let app = build_router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
