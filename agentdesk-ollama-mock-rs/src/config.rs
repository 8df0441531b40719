use clap::Parser;
use std::time::Duration;

/// Mock Ollama server: a local stand-in for the Ollama / OpenAI chat API.
#[derive(Parser, Debug, Clone)]
#[command(name = "ollama-mock", version, about)]
pub struct MockConfig {
    /// Address to bind
    #[arg(long, env = "MOCK_OLLAMA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind (Ollama's default)
    #[arg(long, env = "MOCK_OLLAMA_PORT", default_value_t = 11434)]
    pub port: u16,

    /// Pause after each streamed word, in milliseconds
    #[arg(long, env = "MOCK_OLLAMA_TOKEN_DELAY_MS", default_value_t = 50)]
    pub token_delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            token_delay_ms: 50,
        }
    }
}

impl MockConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = MockConfig::try_parse_from(["ollama-mock"]).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:11434");
        assert_eq!(config.token_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_cli_flags() {
        let config = MockConfig::try_parse_from([
            "ollama-mock",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--token-delay-ms",
            "0",
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.token_delay().is_zero());
    }
}
