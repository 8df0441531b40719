use crate::error::{parse_body, MockError};
use crate::models::{
    ChatCompletionChunk, ChatDelta, ChatRequest, HealthResponse, ShowRequest, ShowResponse,
    TagsResponse, VersionResponse,
};
use crate::responses::{self, MockResponses};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::header,
    response::{
        sse::{Event as SseEvent, Sse},
        IntoResponse, Json, Response,
    },
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

pub const NDJSON: &str = "application/x-ndjson";

pub struct MockState {
    pub responses: MockResponses,
    pub token_delay: Duration,
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running".to_string(),
        message: "Mock Ollama Server is running".to_string(),
        version: "1.0.0".to_string(),
    })
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: "0.1.0".to_string(),
    })
}

pub async fn list_models() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![responses::mock_model()],
    })
}

fn show(request: &ShowRequest) -> Result<Json<ShowResponse>, MockError> {
    let name = request
        .model_name()
        .ok_or_else(|| MockError::Unprocessable("model name is required".to_string()))?;
    tracing::debug!(model = name, "show model");
    Ok(Json(responses::mock_show()))
}

pub async fn show_model_query(
    Query(request): Query<ShowRequest>,
) -> Result<Json<ShowResponse>, MockError> {
    show(&request)
}

pub async fn show_model(body: Bytes) -> Result<Json<ShowResponse>, MockError> {
    let request = if body.is_empty() {
        ShowRequest::default()
    } else {
        parse_body(&body)?
    };
    show(&request)
}

/// Ollama native `/api/chat`.
pub async fn ollama_chat(
    State(state): State<Arc<MockState>>,
    body: Bytes,
) -> Result<Response, MockError> {
    let request: ChatRequest = parse_body(&body)?;
    let text = state.responses.select(&request.messages).to_string();
    let prompt_count = request.messages.len();
    tracing::info!(
        model = %request.model,
        messages = prompt_count,
        stream = request.stream,
        "chat request"
    );

    if !request.stream {
        let eval_count = responses::word_count(&text);
        let reply = responses::ollama_done(&request.model, &text, prompt_count, eval_count);
        return Ok(Json(reply).into_response());
    }

    let delay = state.token_delay;
    let model = request.model;
    let stream = async_stream::stream! {
        let pieces = responses::word_pieces(&text);
        let eval_count = pieces.len();
        for piece in pieces {
            let chunk = responses::ollama_chunk(&model, &piece);
            if let Ok(mut line) = serde_json::to_vec(&chunk) {
                line.push(b'\n');
                yield Ok::<_, Infallible>(Bytes::from(line));
            }
            pause(delay).await;
        }
        let done = responses::ollama_done(&model, "", prompt_count, eval_count);
        if let Ok(mut line) = serde_json::to_vec(&done) {
            line.push(b'\n');
            yield Ok(Bytes::from(line));
        }
    };

    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(stream)).into_response())
}

/// OpenAI compatible `/v1/chat/completions`.
pub async fn openai_chat(
    State(state): State<Arc<MockState>>,
    body: Bytes,
) -> Result<Response, MockError> {
    let request: ChatRequest = parse_body(&body)?;
    let text = state.responses.select(&request.messages).to_string();
    let prompt_count = request.messages.len();
    tracing::info!(
        model = %request.model,
        messages = prompt_count,
        stream = request.stream,
        "chat completion request"
    );

    if !request.stream {
        let completion = responses::openai_completion(&request.model, &text, prompt_count);
        return Ok(Json(completion).into_response());
    }

    let delay = state.token_delay;
    let model = request.model;
    let id = responses::completion_id();
    let stream = async_stream::stream! {
        let role = ChatDelta {
            role: Some("assistant".to_string()),
            content: None,
        };
        let first = ChatCompletionChunk::new(&id, &model, role, None);
        if let Ok(data) = serde_json::to_string(&first) {
            yield Ok::<_, Infallible>(SseEvent::default().data(data));
        }

        for piece in responses::word_pieces(&text) {
            let delta = ChatDelta {
                role: None,
                content: Some(piece),
            };
            let chunk = ChatCompletionChunk::new(&id, &model, delta, None);
            if let Ok(data) = serde_json::to_string(&chunk) {
                yield Ok(SseEvent::default().data(data));
            }
            pause(delay).await;
        }

        let last = ChatCompletionChunk::new(&id, &model, ChatDelta::default(), Some("stop"));
        if let Ok(data) = serde_json::to_string(&last) {
            yield Ok(SseEvent::default().data(data));
        }
        yield Ok(SseEvent::default().data("[DONE]"));
    };

    Ok(Sse::new(stream).into_response())
}
