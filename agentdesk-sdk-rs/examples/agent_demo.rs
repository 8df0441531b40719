use agentdesk_sdk_rs::{
    catalog::AgentCatalog,
    events::Content,
    llm::{LLMConfig, LLM},
    runner::Runner,
    session::{InMemorySessionService, SessionService},
};
use serde_json::Map;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    agentdesk_sdk_rs::logger::init_logging();

    // MODEL_OVERRIDE=test_model sends every agent to a local Ollama (or the mock).
    let model_override = std::env::var("MODEL_OVERRIDE").ok();
    let api_key = std::env::var("GOOGLE_API_KEY").ok();
    if api_key.is_none() && model_override.is_none() {
        println!("Set GOOGLE_API_KEY, or MODEL_OVERRIDE to use a local model.");
        return Ok(());
    }

    let catalog = AgentCatalog::new(model_override.as_deref());
    let Some(orchestrator) = catalog.get("orchestrator_agent") else {
        return Err("orchestrator_agent missing from catalog".into());
    };

    let sessions: Arc<dyn SessionService> = Arc::new(InMemorySessionService::new());
    let session = sessions
        .create_session("demo_app", "demo_user", None, Map::new())
        .await?;
    let runner = Runner::new(
        "demo_app",
        orchestrator,
        sessions,
        Arc::new(LLM::new(LLMConfig {
            api_key,
            ollama_base_url: std::env::var("OLLAMA_BASE_URL").ok(),
        })),
    );

    for question in ["What is the capital of France?", "Tell me a joke"] {
        println!("\nUser: {}", question);
        let events = runner
            .run("demo_user", &session.id, Content::user_text(question))
            .await?;
        for event in events.iter().filter(|e| e.is_final_response()) {
            if let Some(text) = event.first_text() {
                println!("[{}] {}", event.author, text);
            }
        }
    }

    Ok(())
}
