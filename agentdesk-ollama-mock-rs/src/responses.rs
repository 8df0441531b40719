use crate::models::{
    ChatCompletion, ChatResponse, CompletionChoice, Message, ModelDetails, ModelInfo,
    ResponseMessage, ShowResponse, Usage,
};
use chrono::Utc;

pub const DEFAULT_RESPONSE: &str =
    "This is a mock response from the Ollama server. Your agent is working correctly!";
pub const JOKE_RESPONSE: &str =
    "Why do programmers prefer dark mode? Because light attracts bugs! 🐛";
pub const JOKE_KEYWORDS: [&str; 4] = ["joke", "funny", "humor", "laugh"];

pub const TOTAL_DURATION: u64 = 1_000_000_000;
pub const LOAD_DURATION: u64 = 100_000_000;
pub const PROMPT_EVAL_DURATION: u64 = 200_000_000;
pub const EVAL_DURATION: u64 = 700_000_000;

/// Canned replies, chosen from the last message of the conversation.
#[derive(Debug, Clone)]
pub struct MockResponses {
    pub default: String,
    pub joke: String,
}

impl Default for MockResponses {
    fn default() -> Self {
        Self {
            default: DEFAULT_RESPONSE.to_string(),
            joke: JOKE_RESPONSE.to_string(),
        }
    }
}

impl MockResponses {
    pub fn select(&self, messages: &[Message]) -> &str {
        let last = messages
            .last()
            .map(|m| m.text().to_lowercase())
            .unwrap_or_default();
        if JOKE_KEYWORDS.iter().any(|k| last.contains(k)) {
            &self.joke
        } else {
            &self.default
        }
    }
}

/// UTC time the way Ollama prints it, microsecond precision with a `Z`.
pub fn created_at() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// The text split into stream pieces: every word but the last keeps a
/// trailing space so the pieces concatenate back to the normalized text.
pub fn word_pieces(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, w)| if i < last { format!("{} ", w) } else { w.to_string() })
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn ollama_chunk(model: &str, content: &str) -> ChatResponse {
    ChatResponse {
        model: model.to_string(),
        created_at: created_at(),
        message: ResponseMessage::assistant(content),
        done: false,
        total_duration: None,
        load_duration: None,
        prompt_eval_count: None,
        prompt_eval_duration: None,
        eval_count: None,
        eval_duration: None,
    }
}

pub fn ollama_done(model: &str, content: &str, prompt_count: usize, eval_count: usize) -> ChatResponse {
    ChatResponse {
        done: true,
        total_duration: Some(TOTAL_DURATION),
        load_duration: Some(LOAD_DURATION),
        prompt_eval_count: Some(prompt_count),
        prompt_eval_duration: Some(PROMPT_EVAL_DURATION),
        eval_count: Some(eval_count),
        eval_duration: Some(EVAL_DURATION),
        ..ollama_chunk(model, content)
    }
}

pub fn openai_completion(model: &str, content: &str, prompt_count: usize) -> ChatCompletion {
    let completion_tokens = word_count(content);
    ChatCompletion {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![CompletionChoice {
            index: 0,
            message: ResponseMessage::assistant(content),
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens: prompt_count,
            completion_tokens,
            total_tokens: prompt_count + completion_tokens,
        },
    }
}

pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

fn mock_details() -> ModelDetails {
    ModelDetails {
        format: "gguf".to_string(),
        family: "llama".to_string(),
        parameter_size: "7B".to_string(),
        quantization_level: "Q4_0".to_string(),
    }
}

pub fn mock_model() -> ModelInfo {
    ModelInfo {
        name: "test_model:latest".to_string(),
        modified_at: created_at(),
        size: 4_000_000_000,
        digest: "mock_digest_123".to_string(),
        details: mock_details(),
    }
}

pub fn mock_show() -> ShowResponse {
    ShowResponse {
        modelfile: "# Mock model".to_string(),
        parameters: "temperature 0.7\ntop_p 0.9".to_string(),
        template: "{{ .System }}\n{{ .Prompt }}".to_string(),
        details: mock_details(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(content: &str) -> Message {
        Message {
            role: Role::User,
            content: Some(content.to_string()),
        }
    }

    #[test]
    fn test_joke_keywords_case_insensitive() {
        let responses = MockResponses::default();
        for text in ["Tell me a JOKE", "something funny", "Humor me", "make me laugh"] {
            assert_eq!(responses.select(&[user(text)]), JOKE_RESPONSE, "{}", text);
        }
    }

    #[test]
    fn test_only_last_message_counts() {
        let responses = MockResponses::default();
        let messages = [user("tell me a joke"), user("Hello, how are you?")];
        assert_eq!(responses.select(&messages), DEFAULT_RESPONSE);
    }

    #[test]
    fn test_empty_conversation_gets_default() {
        assert_eq!(MockResponses::default().select(&[]), DEFAULT_RESPONSE);
    }

    #[test]
    fn test_word_pieces() {
        assert_eq!(word_pieces("a b  c"), vec!["a ", "b ", "c"]);
        assert_eq!(word_pieces(JOKE_RESPONSE).concat(), JOKE_RESPONSE);
        assert!(word_pieces("").is_empty());
    }

    #[test]
    fn test_ollama_done_stats() {
        let done = ollama_done("test_model", "", 2, 13);
        assert!(done.done);
        assert_eq!(done.total_duration, Some(TOTAL_DURATION));
        assert_eq!(done.prompt_eval_count, Some(2));
        assert_eq!(done.eval_count, Some(13));
        assert_eq!(done.message.content, "");
    }

    #[test]
    fn test_partial_chunk_omits_stats() {
        let value = serde_json::to_value(ollama_chunk("m", "Why ")).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(value["done"], false);
    }

    #[test]
    fn test_created_at_format() {
        let ts = created_at();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        // 2024-01-01T00:00:00.000000Z
        assert_eq!(ts.len(), 27);
    }

    #[test]
    fn test_openai_usage() {
        let completion = openai_completion("test_model", DEFAULT_RESPONSE, 2);
        assert_eq!(completion.usage.prompt_tokens, 2);
        assert_eq!(completion.usage.completion_tokens, 14);
        assert_eq!(completion.usage.total_tokens, 16);
        assert!(completion.id.starts_with("chatcmpl-"));
    }
}
