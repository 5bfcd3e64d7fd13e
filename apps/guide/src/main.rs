mod config;
mod errors;
mod generation;
mod grounding;
mod llm_client;
mod models;
mod reference;
mod retrieval;
mod routes;
mod scope;
mod session;
mod state;
mod text;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::generation::Generator;
use crate::llm_client::LlmClient;
use crate::reference::{DirectorySource, ReferenceSource};
use crate::retrieval::SystemClock;
use crate::routes::build_router;
use crate::session::{PipelineSettings, SessionRegistry};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Local Guide v{}", env!("CARGO_PKG_VERSION"));

    // Reference documents are read per city selection, not cached here
    let source: Arc<dyn ReferenceSource> = Arc::new(DirectorySource::new(&config.reference_dir));
    if !config.reference_dir.is_dir() {
        warn!(
            "Reference directory {} does not exist; every city selection will fail",
            config.reference_dir.display()
        );
    }
    info!("Reference source: {}", config.reference_dir.display());

    // The HTTP client timeout sits just above the pipeline's own generation timeout
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.generation_timeout + std::time::Duration::from_secs(5),
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let generator: Arc<dyn Generator> = Arc::new(llm);

    let settings = PipelineSettings {
        top_k: config.retrieval_top_k,
        generation_timeout: config.generation_timeout,
    };
    info!(
        "Pipeline: top_k={}, generation timeout {}s, session idle ttl {}s, diagnostics {}",
        settings.top_k,
        settings.generation_timeout.as_secs(),
        config.session_idle_ttl.as_secs(),
        if config.expose_diagnostics { "exposed" } else { "hidden" }
    );

    let sessions = SessionRegistry::new(
        source.clone(),
        generator.clone(),
        Arc::new(SystemClock),
        settings,
        config.session_idle_ttl,
    );

    // Build app state
    let state = AppState {
        sessions: Arc::new(sessions),
        source,
        generator,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
