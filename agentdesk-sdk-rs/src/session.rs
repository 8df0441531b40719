use crate::error::{Result, SdkError};
use crate::events::Event;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod database;
pub use database::DatabaseSessionService;

pub mod memory;
pub use memory::InMemorySessionService;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    pub(crate) fn not_found(&self) -> SdkError {
        SdkError::SessionNotFound {
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    #[serde(default)]
    pub state: Map<String, Value>,
    #[serde(default)]
    pub events: Vec<Event>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.app_name, &self.user_id, &self.id)
    }
}

/// Storage for conversation sessions and their event history.
///
/// `get_session` distinguishes "absent" (`Ok(None)`) from failure so callers
/// can create sessions lazily. `append_event` skips partial events and merges
/// the event's `state_delta` into the session state.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
        state: Map<String, Value>,
    ) -> Result<Session>;

    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>>;

    /// Sessions of one user, without their events.
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>>;

    async fn delete_session(&self, key: &SessionKey) -> Result<()>;

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<()>;
}

pub(crate) fn new_session_id(session_id: Option<String>) -> String {
    session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
