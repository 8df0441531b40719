use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

#[derive(Debug)]
pub enum MockError {
    /// Body is not JSON at all.
    InvalidJson,
    /// JSON that does not fit the request model.
    Unprocessable(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            MockError::InvalidJson => (StatusCode::BAD_REQUEST, "Invalid JSON".to_string()),
            MockError::Unprocessable(d) => (StatusCode::UNPROCESSABLE_ENTITY, d),
        };
        tracing::warn!(status = %status, "rejected request: {}", detail);
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Parses a request body in two steps so malformed JSON and a wrong shape
/// map to different status codes.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, MockError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| MockError::InvalidJson)?;
    serde_json::from_value(value).map_err(|e| MockError::Unprocessable(e.to_string()))
}
