use crate::error::{Result, SdkError};
use std::env;

/// Settings of the agent server, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub database_url: String,
    pub root_agent: String,
    pub model_override: Option<String>,
    pub google_api_key: Option<String>,
    pub ollama_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            app_name: "jokes_app".to_string(),
            user_id: "user_123".to_string(),
            session_id: "session_123".to_string(),
            database_url: "sqlite://sessions.db?mode=rwc".to_string(),
            root_agent: "jokes_agent".to_string(),
            model_override: None,
            google_api_key: None,
            ollama_base_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|e| SdkError::Config(format!("PORT={}: {}", p, e)))?,
            None => defaults.port,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            user_id: get("USER_ID").unwrap_or(defaults.user_id),
            session_id: get("SESSION_ID").unwrap_or(defaults.session_id),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            root_agent: get("ROOT_AGENT").unwrap_or(defaults.root_agent),
            model_override: get("MODEL_OVERRIDE"),
            google_api_key: get("GOOGLE_API_KEY"),
            ollama_base_url: get("OLLAMA_BASE_URL"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
