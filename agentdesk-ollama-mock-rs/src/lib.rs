pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod responses;

use axum::{
    routing::{get, post},
    Router,
};
use config::MockConfig;
use handlers::MockState;
use responses::MockResponses;
use std::sync::Arc;

pub fn router(config: &MockConfig) -> Router {
    let state = Arc::new(MockState {
        responses: MockResponses::default(),
        token_delay: config.token_delay(),
    });

    Router::new()
        .route("/", get(handlers::health))
        .route("/api/version", get(handlers::version))
        .route("/api/tags", get(handlers::list_models))
        .route(
            "/api/show",
            get(handlers::show_model_query).post(handlers::show_model),
        )
        .route("/api/chat", post(handlers::ollama_chat))
        .route("/v1/chat/completions", post(handlers::openai_chat))
        .with_state(state)
}
