use agentdesk_sdk_rs::SdkError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Internal(String),
}

impl From<SdkError> for ApiError {
    fn from(err: SdkError) -> Self {
        match err {
            SdkError::SessionNotFound { .. } => ApiError::NotFound("Session not found".to_string()),
            SdkError::AgentNotFound(name) => ApiError::NotFound(format!("Agent not found: {}", name)),
            SdkError::SessionAlreadyExists(id) => {
                ApiError::Conflict(format!("Session already exists: {}", id))
            }
            SdkError::Serialization(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
            ApiError::Conflict(d) => (StatusCode::CONFLICT, d),
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::Internal(d) => {
                tracing::error!("request failed: {}", d);
                (StatusCode::INTERNAL_SERVER_ERROR, d)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
