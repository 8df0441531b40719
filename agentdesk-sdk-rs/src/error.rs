use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("llm request failed: {0}")]
    Llm(String),

    #[error("session not found: {app_name}/{user_id}/{session_id}")]
    SessionNotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    #[error("session already exists: {0}")]
    SessionAlreadyExists(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("max iterations ({0}) reached")]
    MaxIterations(usize),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SdkError>;
