use crate::error::ApiError;
use crate::models::CreateSessionRequest;
use agentdesk_sdk_rs::{
    catalog::AgentCatalog,
    config::ServerConfig,
    llm::ChatModel,
    runner::Runner,
    session::{Session, SessionKey, SessionService},
    SdkError,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AppState {
    pub config: ServerConfig,
    pub catalog: AgentCatalog,
    pub session_service: Arc<dyn SessionService>,
    pub default_runner: Runner,
    runners: HashMap<String, Runner>,
}

impl AppState {
    /// Builds one runner per catalog agent (the app name is the agent name)
    /// plus the default runner serving `/agent`.
    pub fn new(
        config: ServerConfig,
        catalog: AgentCatalog,
        session_service: Arc<dyn SessionService>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self, SdkError> {
        let root = catalog
            .get(&config.root_agent)
            .ok_or_else(|| SdkError::AgentNotFound(config.root_agent.clone()))?;
        let default_runner = Runner::new(
            config.app_name.clone(),
            root,
            session_service.clone(),
            model.clone(),
        );

        let runners = catalog
            .iter()
            .map(|(name, agent)| {
                let runner = Runner::new(
                    name.clone(),
                    agent.clone(),
                    session_service.clone(),
                    model.clone(),
                );
                (name.clone(), runner)
            })
            .collect();

        Ok(Self {
            config,
            catalog,
            session_service,
            default_runner,
            runners,
        })
    }

    pub fn runner(&self, app_name: &str) -> Result<&Runner, ApiError> {
        if app_name == self.config.app_name {
            return Ok(&self.default_runner);
        }
        self.runners
            .get(app_name)
            .ok_or_else(|| ApiError::NotFound(format!("App not found: {}", app_name)))
    }
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

pub async fn alive() -> impl IntoResponse {
    Json(json!({
        "status": "ok"
    }))
}

/// Every catalog agent plus the configured app name, sorted.
pub async fn list_apps(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let mut apps = state.catalog.names();
    if !apps.contains(&state.config.app_name) {
        apps.push(state.config.app_name.clone());
    }
    apps.sort();
    Json(apps)
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path((app_name, user_id)): Path<(String, String)>,
) -> Result<Json<Vec<Session>>, ApiError> {
    state.runner(&app_name)?;
    let sessions = state
        .session_service
        .list_sessions(&app_name, &user_id)
        .await?;
    Ok(Json(sessions))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Path((app_name, user_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Session>, ApiError> {
    create(&state, app_name, user_id, None, &body).await
}

pub async fn create_session_with_id(
    State(state): State<Arc<AppState>>,
    Path((app_name, user_id, session_id)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<Session>, ApiError> {
    create(&state, app_name, user_id, Some(session_id), &body).await
}

async fn create(
    state: &AppState,
    app_name: String,
    user_id: String,
    session_id: Option<String>,
    body: &[u8],
) -> Result<Json<Session>, ApiError> {
    state.runner(&app_name)?;
    let req: CreateSessionRequest = if body.is_empty() {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let session = state
        .session_service
        .create_session(
            &app_name,
            &user_id,
            session_id,
            req.state.unwrap_or_default(),
        )
        .await?;
    tracing::info!(app = %app_name, user = %user_id, session = %session.id, "session created");
    Ok(Json(session))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path((app_name, user_id, session_id)): Path<(String, String, String)>,
) -> Result<Json<Session>, ApiError> {
    state.runner(&app_name)?;
    let key = SessionKey::new(app_name, user_id, session_id);
    match state.session_service.get_session(&key).await? {
        Some(session) => Ok(Json(session)),
        None => Err(ApiError::NotFound("Session not found".to_string())),
    }
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path((app_name, user_id, session_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state.runner(&app_name)?;
    let key = SessionKey::new(app_name, user_id, session_id);
    state.session_service.delete_session(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
