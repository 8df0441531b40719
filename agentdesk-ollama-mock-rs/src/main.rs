use agentdesk_ollama_mock_rs::{config::MockConfig, router};
use clap::Parser;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MockConfig::parse();

    agentdesk_sdk_rs::logger::init_logging();

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        token_delay_ms = config.token_delay_ms,
        "Mock Ollama server listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, router(&config)).await?;
    Ok(())
}
