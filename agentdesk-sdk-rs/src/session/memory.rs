use crate::error::{Result, SdkError};
use crate::events::Event;
use crate::session::{Session, SessionKey, SessionService, new_session_id};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local session store. Everything is lost on restart.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
        state: Map<String, Value>,
    ) -> Result<Session> {
        let key = SessionKey::new(app_name, user_id, new_session_id(session_id));
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(SdkError::SessionAlreadyExists(key.session_id));
        }

        let session = Session {
            id: key.session_id.clone(),
            app_name: key.app_name.clone(),
            user_id: key.user_id.clone(),
            state,
            events: Vec::new(),
            last_update_time: Utc::now(),
        };
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<Session> = sessions
            .values()
            .filter(|s| s.app_name == app_name && s.user_id == user_id)
            .map(|s| Session {
                events: Vec::new(),
                ..s.clone()
            })
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn delete_session(&self, key: &SessionKey) -> Result<()> {
        match self.sessions.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(key.not_found()),
        }
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<()> {
        if event.partial {
            return Ok(());
        }
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(key).ok_or_else(|| key.not_found())?;
        for (k, v) in &event.actions.state_delta {
            session.state.insert(k.clone(), v.clone());
        }
        session.last_update_time = event.timestamp;
        session.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Content;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_delete() {
        let service = InMemorySessionService::new();
        let created = service
            .create_session("jokes_app", "user_123", Some("session_123".to_string()), Map::new())
            .await
            .unwrap();
        assert_eq!(created.id, "session_123");

        let key = created.key();
        assert!(service.get_session(&key).await.unwrap().is_some());

        service.delete_session(&key).await.unwrap();
        assert!(service.get_session(&key).await.unwrap().is_none());
        assert!(matches!(
            service.delete_session(&key).await,
            Err(SdkError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let service = InMemorySessionService::new();
        service
            .create_session("app", "u", Some("s".to_string()), Map::new())
            .await
            .unwrap();
        let err = service
            .create_session("app", "u", Some("s".to_string()), Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::SessionAlreadyExists(id) if id == "s"));
    }

    #[tokio::test]
    async fn test_generated_id() {
        let service = InMemorySessionService::new();
        let session = service.create_session("app", "u", None, Map::new()).await.unwrap();
        assert_eq!(session.id.len(), 36);
    }

    #[tokio::test]
    async fn test_append_event_merges_state_and_skips_partial() {
        let service = InMemorySessionService::new();
        let key = service
            .create_session("app", "u", Some("s".to_string()), Map::new())
            .await
            .unwrap()
            .key();

        let mut event = Event::new("inv", "user").with_content(Content::user_text("hi"));
        event.actions.state_delta.insert("topic".to_string(), json!("jokes"));
        service.append_event(&key, event).await.unwrap();

        let mut partial = Event::new("inv", "jokes_agent").with_content(Content::model_text("h"));
        partial.partial = true;
        service.append_event(&key, partial).await.unwrap();

        let session = service.get_session(&key).await.unwrap().unwrap();
        assert_eq!(session.events.len(), 1);
        assert_eq!(session.state["topic"], json!("jokes"));
    }

    #[tokio::test]
    async fn test_append_to_missing_session() {
        let service = InMemorySessionService::new();
        let key = SessionKey::new("app", "u", "missing");
        let err = service.append_event(&key, Event::new("inv", "user")).await.unwrap_err();
        assert!(matches!(err, SdkError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let service = InMemorySessionService::new();
        for (user, id) in [("u1", "b"), ("u1", "a"), ("u2", "c")] {
            service
                .create_session("app", user, Some(id.to_string()), Map::new())
                .await
                .unwrap();
        }
        let ids: Vec<_> = service
            .list_sessions("app", "u1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
