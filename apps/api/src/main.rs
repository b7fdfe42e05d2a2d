mod analysis;
mod config;
mod errors;
mod llm_client;
mod prompt_store;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::service::{AnalysisService, PromptDefaults};
use crate::config::Config;
use crate::llm_client::{Generator, OllamaClient};
use crate::prompt_store::PromptStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a half-configured backend is a startup error
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting analyzer v{}", env!("CARGO_PKG_VERSION"));

    let prompts = PromptStore::new(&config.prompt_dir);
    info!("Prompt directory: {}", prompts.base_dir().display());

    let generator: Option<Arc<dyn Generator>> = match &config.backend {
        Some(backend) => {
            let client = OllamaClient::new(backend)?;
            info!(
                "Generation backend: {} (model: {}, audit log: {})",
                client.endpoint(),
                client.model(),
                client.audit_path().display()
            );
            Some(Arc::new(client) as Arc<dyn Generator>)
        }
        None => {
            info!("OLLAMA_API_URL not set; running in template-preview-only mode");
            None
        }
    };

    let analysis = AnalysisService::new(
        prompts,
        PromptDefaults {
            prompt_name: config.default_prompt.clone(),
            system_prompt_name: config.default_system_prompt.clone(),
        },
        generator,
    );
    info!(
        "Default prompt: {} (preview only: {})",
        analysis.default_prompt_name(),
        analysis.is_preview_only()
    );

    let state = AppState {
        analysis: Arc::new(analysis),
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
