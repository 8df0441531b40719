use crate::agent_api::{call_agent, run, run_sse};
use crate::handlers::{self, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/alive", get(handlers::alive))
        // Agent Routes
        .route("/agent", post(call_agent))
        .route("/run", post(run))
        .route("/run_sse", post(run_sse))
        // Session Routes
        .route("/list-apps", get(handlers::list_apps))
        .route(
            "/apps/{app_name}/users/{user_id}/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/apps/{app_name}/users/{user_id}/sessions/{session_id}",
            get(handlers::get_session)
                .post(handlers::create_session_with_id)
                .delete(handlers::delete_session),
        )
        .with_state(state)
}
