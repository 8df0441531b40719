use crate::error::{Result, SdkError};
use crate::events::Event;
use crate::session::{Session, SessionKey, SessionService, new_session_id};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

/// SQLite-backed session store. Events are kept as JSON documents in
/// insertion order.
pub struct DatabaseSessionService {
    pool: SqlitePool,
}

impl DatabaseSessionService {
    /// Connects to `database_url` (e.g. `sqlite://sessions.db?mode=rwc`) and
    /// creates the tables if needed.
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Every connection to `:memory:` opens a distinct database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let service = Self { pool };
        service.migrate().await?;
        tracing::info!(url = %database_url, "session database ready");
        Ok(service)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                app_name TEXT NOT NULL,
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (app_name, user_id, session_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                app_name TEXT NOT NULL,
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                event TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (app_name, user_id, session_id)
                    REFERENCES sessions(app_name, user_id, session_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn session_from_row(row: &SqliteRow) -> Result<Session> {
        let state: String = row.try_get("state")?;
        Ok(Session {
            id: row.try_get("session_id")?,
            app_name: row.try_get("app_name")?,
            user_id: row.try_get("user_id")?,
            state: serde_json::from_str(&state)?,
            events: Vec::new(),
            last_update_time: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl SessionService for DatabaseSessionService {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
        state: Map<String, Value>,
    ) -> Result<Session> {
        let session_id = new_session_id(session_id);
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT 1 FROM sessions WHERE app_name = ? AND user_id = ? AND session_id = ?",
        )
        .bind(app_name)
        .bind(user_id)
        .bind(&session_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(SdkError::SessionAlreadyExists(session_id));
        }

        sqlx::query(
            "INSERT INTO sessions (app_name, user_id, session_id, state, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(app_name)
        .bind(user_id)
        .bind(&session_id)
        .bind(serde_json::to_string(&state)?)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Session {
            id: session_id,
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state,
            events: Vec::new(),
            last_update_time: now,
        })
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT app_name, user_id, session_id, state, updated_at FROM sessions WHERE app_name = ? AND user_id = ? AND session_id = ?",
        )
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut session = Self::session_from_row(&row)?;

        let rows = sqlx::query(
            "SELECT event FROM events WHERE app_name = ? AND user_id = ? AND session_id = ? ORDER BY timestamp, seq",
        )
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let json: String = row.try_get("event")?;
            session.events.push(serde_json::from_str::<Event>(&json)?);
        }
        Ok(Some(session))
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(
            "SELECT app_name, user_id, session_id, state, updated_at FROM sessions WHERE app_name = ? AND user_id = ? ORDER BY session_id",
        )
        .bind(app_name)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::session_from_row).collect()
    }

    async fn delete_session(&self, key: &SessionKey) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM events WHERE app_name = ? AND user_id = ? AND session_id = ?")
            .bind(&key.app_name)
            .bind(&key.user_id)
            .bind(&key.session_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query(
            "DELETE FROM sessions WHERE app_name = ? AND user_id = ? AND session_id = ?",
        )
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(key.not_found());
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<()> {
        if event.partial {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT state FROM sessions WHERE app_name = ? AND user_id = ? AND session_id = ?",
        )
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| key.not_found())?;

        let state_json: String = row.try_get("state")?;
        let mut state: Map<String, Value> = serde_json::from_str(&state_json)?;
        for (k, v) in &event.actions.state_delta {
            state.insert(k.clone(), v.clone());
        }

        sqlx::query(
            "UPDATE sessions SET state = ?, updated_at = ? WHERE app_name = ? AND user_id = ? AND session_id = ?",
        )
        .bind(serde_json::to_string(&state)?)
        .bind(event.timestamp)
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO events (id, app_name, user_id, session_id, event, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&key.app_name)
        .bind(&key.user_id)
        .bind(&key.session_id)
        .bind(serde_json::to_string(&event)?)
        .bind(event.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
