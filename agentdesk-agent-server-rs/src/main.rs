mod agent_api;
mod error;
mod handlers;
mod models;
mod routes;

use crate::handlers::AppState;
use agentdesk_sdk_rs::{
    catalog::AgentCatalog,
    config::ServerConfig,
    llm::{ChatModel, LLMConfig, LLM},
    session::{DatabaseSessionService, SessionService},
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Set up tracing using the SDK's logger
    agentdesk_sdk_rs::logger::init_logging();

    let config = ServerConfig::from_env()?;

    let session_service: Arc<dyn SessionService> =
        Arc::new(DatabaseSessionService::connect(&config.database_url).await?);
    let catalog = AgentCatalog::new(config.model_override.as_deref());
    let model: Arc<dyn ChatModel> = Arc::new(LLM::new(LLMConfig {
        api_key: config.google_api_key.clone(),
        ollama_base_url: config.ollama_base_url.clone(),
    }));

    tracing::info!(
        app = %config.app_name,
        agent = %config.root_agent,
        "serving agents: {}",
        catalog.names().join(", ")
    );

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, catalog, session_service, model)?);
    let app = routes::router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
