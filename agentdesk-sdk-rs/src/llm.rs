use crate::error::{Result, SdkError};
use crate::events::{Content, FunctionCall, Part, ROLE_MODEL, ROLE_USER};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::resolver::{Endpoint, ServiceTargetResolver};
use genai::{Client, ServiceTarget};
use genai::chat::{ChatMessage, ChatRequest, ChatRole, ContentPart, ToolCall, ToolResponse};
use serde::Deserialize;
use serde_json::Value;
use std::env;

/// A function the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_instruction: String,
    pub contents: Vec<Content>,
    pub tools: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: Option<Content>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::model_text(text)),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    /// Base URL for models genai routes to Ollama, e.g. `http://127.0.0.1:11434/v1/`.
    #[serde(default)]
    pub ollama_base_url: Option<String>,
}

/// `ChatModel` backed by genai, which picks the provider from the model name
/// (`gemini-*`, `gpt-*`, `claude-*`, anything else goes to a local Ollama).
#[derive(Clone)]
pub struct LLM {
    pub client: Client,
}

impl LLM {
    pub fn new(config: LLMConfig) -> Self {
        let existing = env::var("GEMINI_API_KEY").ok();
        if let Some(key) = gemini_key_to_export(config.api_key.as_deref(), existing.as_deref()) {
            unsafe {
                env::set_var("GEMINI_API_KEY", key);
            }
        }

        let mut builder = Client::builder();
        if let Some(base_url) = config.ollama_base_url {
            builder = builder.with_service_target_resolver(ollama_resolver(base_url));
        }
        Self {
            client: builder.build(),
        }
    }
}

/// The key to export for genai's Gemini adapter; an existing value wins.
fn gemini_key_to_export<'a>(api_key: Option<&'a str>, existing: Option<&str>) -> Option<&'a str> {
    match existing {
        Some(_) => None,
        None => api_key.filter(|k| !k.is_empty()),
    }
}

/// Sends Ollama-bound models to `base_url`, leaving other providers alone.
fn ollama_resolver(base_url: String) -> ServiceTargetResolver {
    let base_url = if base_url.ends_with('/') {
        base_url
    } else {
        format!("{}/", base_url)
    };
    ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> genai::resolver::Result<ServiceTarget> {
            if target.model.adapter_kind != AdapterKind::Ollama {
                return Ok(target);
            }
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(base_url.clone()),
                ..target
            })
        },
    )
}

#[async_trait]
impl ChatModel for LLM {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let mut chat_req = ChatRequest::new(to_chat_messages(request));

        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(|t| genai::chat::Tool {
                    name: t.name.clone(),
                    description: Some(t.description.clone()),
                    schema: Some(t.parameters.clone()),
                    config: None,
                })
                .collect::<Vec<_>>();
            chat_req = chat_req.with_tools(tools);
        }

        tracing::debug!(model = %request.model, "sending chat request");
        let output = self
            .client
            .exec_chat(&request.model, chat_req, None)
            .await
            .map_err(|e| SdkError::Llm(e.to_string()))?;

        let mut parts = Vec::new();
        let text: String = output.content.texts().join("");
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }
        for call in output.tool_calls() {
            parts.push(Part::FunctionCall(FunctionCall {
                id: call.call_id.clone(),
                name: call.fn_name.clone(),
                args: call.fn_arguments.clone(),
            }));
        }

        if parts.is_empty() {
            return Ok(LlmResponse::default());
        }
        Ok(LlmResponse {
            content: Some(Content::new(ROLE_MODEL, parts)),
        })
    }
}

fn to_chat_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(request.system_instruction.clone())];

    for content in &request.contents {
        if content.role == ROLE_USER {
            for part in &content.parts {
                match part {
                    Part::Text(t) => messages.push(ChatMessage::user(t.clone())),
                    Part::FunctionResponse(r) => messages.push(ChatMessage::from(
                        ToolResponse::new(r.id.clone(), r.response.to_string()),
                    )),
                    Part::FunctionCall(_) => {}
                }
            }
            continue;
        }

        let mut parts = vec![];
        for part in &content.parts {
            match part {
                Part::Text(t) => parts.push(ContentPart::Text(t.clone())),
                Part::FunctionCall(c) => parts.push(ContentPart::ToolCall(ToolCall {
                    call_id: c.id.clone(),
                    fn_name: c.name.clone(),
                    fn_arguments: c.args.clone(),
                })),
                Part::FunctionResponse(_) => {}
            }
        }
        if !parts.is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: parts.into(),
                options: None,
            });
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FunctionResponse;
    use serde_json::json;

    fn request(contents: Vec<Content>) -> LlmRequest {
        LlmRequest {
            model: "gemini-2.0-flash".to_string(),
            system_instruction: "You are an agent that tells jokes.".to_string(),
            contents,
            tools: vec![],
        }
    }

    #[test]
    fn test_messages_start_with_system_instruction() {
        let messages = to_chat_messages(&request(vec![Content::user_text("hi")]));
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].role, ChatRole::System));
        assert!(matches!(messages[1].role, ChatRole::User));
    }

    #[test]
    fn test_tool_round_trip_messages() {
        let call = Content::new(
            ROLE_MODEL,
            vec![Part::FunctionCall(FunctionCall {
                id: "call-1".to_string(),
                name: "transfer_to_agent".to_string(),
                args: json!({"agent_name": "capital_agent"}),
            })],
        );
        let response = Content::new(
            ROLE_USER,
            vec![Part::FunctionResponse(FunctionResponse {
                id: "call-1".to_string(),
                name: "transfer_to_agent".to_string(),
                response: json!({"result": "ok"}),
            })],
        );
        let messages = to_chat_messages(&request(vec![
            Content::user_text("capital of France?"),
            call,
            response,
        ]));
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[2].role, ChatRole::Assistant));
        assert!(matches!(messages[3].role, ChatRole::Tool));
    }

    #[test]
    fn test_gemini_key_export() {
        assert_eq!(gemini_key_to_export(Some("k1"), None), Some("k1"));
        assert_eq!(gemini_key_to_export(Some("k1"), Some("k0")), None);
        assert_eq!(gemini_key_to_export(Some(""), None), None);
        assert_eq!(gemini_key_to_export(None, None), None);
    }

    #[tokio::test]
    async fn test_llm_generate() {
        dotenv::dotenv().ok();
        if env::var("GEMINI_API_KEY").is_err() && env::var("GOOGLE_API_KEY").is_err() {
            println!("Skipping test_llm_generate because no Gemini key is set");
            return;
        }

        let llm = LLM::new(LLMConfig {
            api_key: env::var("GOOGLE_API_KEY").ok(),
            ..LLMConfig::default()
        });
        match llm
            .generate(&request(vec![Content::user_text("Tell me a short joke")]))
            .await
        {
            Ok(response) => {
                let text = response.content.map(|c| c.text()).unwrap_or_default();
                assert!(!text.is_empty());
            }
            Err(e) => println!("LLM generate error: {}", e),
        }
    }
}
