use agentdesk_sdk_rs::events::Content;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserQueryRequest {
    pub user_query: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AgentResponse {
    pub agent_response: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub state: Option<Map<String, Value>>,
}

/// Body of `/run` and `/run_sse`. Accepts both camelCase and snake_case keys.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentRequest {
    #[serde(alias = "app_name")]
    pub app_name: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(alias = "session_id")]
    pub session_id: String,
    #[serde(alias = "new_message")]
    pub new_message: Content,
}
