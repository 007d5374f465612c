mod config;
mod diff;
mod errors;
mod extraction;
mod llm_client;
mod render;
mod routes;
mod state;
mod tailoring;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{ChatClient, ChatSettings, OpenAiChatClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::tailoring::prompt_builder::PromptBuilder;
use crate::tailoring::session::InFlightSessions;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobfit API v{}", env!("CARGO_PKG_VERSION"));

    // Refuse to start without a chat credential
    config.require_api_key()?;

    // Initialize chat client
    let chat: Arc<dyn ChatClient> =
        Arc::new(OpenAiChatClient::new(ChatSettings::from_config(&config))?);
    info!(
        "Chat client initialized (model: {}, base url: {})",
        chat.model(),
        config.openai_base_url
    );

    let prompt_builder = PromptBuilder::from_config(&config);

    // Build app state
    let state = AppState {
        chat,
        prompt_builder,
        sessions: InFlightSessions::default(),
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
