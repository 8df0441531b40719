use crate::error::ApiError;
use crate::handlers::AppState;
use crate::models::{AgentResponse, RunAgentRequest, UserQueryRequest};
use agentdesk_sdk_rs::{
    events::{Content, Event},
    session::SessionKey,
    SdkError,
};
use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, Sse},
        IntoResponse, Json,
    },
};
use futures::StreamExt;
use serde_json::{json, Map};
use std::convert::Infallible;
use std::sync::Arc;

pub const NO_RESPONSE: &str = "No response";

/// Text of the last final response that has content, or "No response".
pub fn final_response_text(events: &[Event]) -> String {
    let mut response = NO_RESPONSE.to_string();
    for event in events {
        let has_parts = event
            .content
            .as_ref()
            .is_some_and(|c| !c.parts.is_empty());
        if event.is_final_response() && has_parts {
            response = event
                .first_text()
                .filter(|t| !t.is_empty())
                .unwrap_or(NO_RESPONSE)
                .to_string();
        }
    }
    response
}

/// Single-session endpoint: every query goes to the configured app, user and
/// session. The session is created on first use.
pub async fn call_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UserQueryRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let config = &state.config;
    let key = SessionKey::new(&config.app_name, &config.user_id, &config.session_id);

    if state.session_service.get_session(&key).await?.is_none() {
        let created = state
            .session_service
            .create_session(
                &config.app_name,
                &config.user_id,
                Some(config.session_id.clone()),
                Map::new(),
            )
            .await;
        match created {
            Ok(_) => tracing::info!(session = %config.session_id, "created default session"),
            // A concurrent request got there first.
            Err(SdkError::SessionAlreadyExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let events = state
        .default_runner
        .run(
            &config.user_id,
            &config.session_id,
            Content::user_text(request.user_query),
        )
        .await?;

    Ok(Json(AgentResponse {
        agent_response: final_response_text(&events),
    }))
}

pub async fn run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunAgentRequest>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let runner = state.runner(&request.app_name)?;
    let events = runner
        .run(&request.user_id, &request.session_id, request.new_message)
        .await?;
    Ok(Json(events))
}

/// Streams each event as soon as the runner has stored it. A failure is sent
/// as a final `{"error": ..}` frame after the events that made it.
pub async fn run_sse(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunAgentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let runner = state.runner(&request.app_name)?;
    let mut events = runner.run_stream(&request.user_id, &request.session_id, request.new_message);

    let stream = async_stream::stream! {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(data) => {
                        yield Ok::<_, Infallible>(SseEvent::default().data(data));
                    }
                    Err(e) => {
                        tracing::warn!(event = %event.id, "skipping unserializable event: {}", e);
                    }
                },
                Err(e) => {
                    tracing::error!("run_sse failed: {}", e);
                    let data = json!({ "error": e.to_string() }).to_string();
                    yield Ok(SseEvent::default().data(data));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream))
}
