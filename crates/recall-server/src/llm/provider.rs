// crates/recall-server/src/llm/provider.rs
// LLM provider abstraction layer

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{GenerateRequest, GenerateResult};

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    DeepSeek,
    OpenAi,
    Claude,
    Qianwen,
    /// Local Ollama endpoint; no API key, no rate limit
    OllamaLocal,
}

impl Provider {
    /// Parse provider from its string tag
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deepseek" => Some(Self::DeepSeek),
            "openai" => Some(Self::OpenAi),
            "claude" => Some(Self::Claude),
            "qianwen" => Some(Self::Qianwen),
            "ollama_local" => Some(Self::OllamaLocal),
            _ => None,
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Claude => "CLAUDE_API_KEY",
            Self::Qianwen => "QIANWEN_API_KEY",
            Self::OllamaLocal => "N/A", // Local provider skips the key check
        }
    }

    /// Default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek-chat",
            Self::OpenAi => "gpt-4o-mini",
            Self::Claude => "claude-3-5-haiku-20241022",
            Self::Qianwen => "qwen-plus",
            Self::OllamaLocal => "llama3.3",
        }
    }

    /// Base URL for this provider's API
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com",
            Self::OpenAi => "https://api.openai.com",
            Self::Claude => "https://api.anthropic.com",
            Self::Qianwen => "https://dashscope.aliyuncs.com/compatible-mode",
            Self::OllamaLocal => "http://localhost:11434",
        }
    }

    /// Request timeout in seconds. The local provider gets a long budget
    /// because small machines stream slowly.
    pub fn timeout_secs(&self) -> u64 {
        match self {
            Self::OllamaLocal => 60,
            _ => 40,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::DeepSeek => "deepseek",
            Self::OpenAi => "openai",
            Self::Claude => "claude",
            Self::Qianwen => "qianwen",
            Self::OllamaLocal => "ollama_local",
        };
        write!(f, "{}", tag)
    }
}

/// Trait for LLM clients - all providers must implement this
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a single text-in / text-out generate call
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResult>;

    /// Get the provider type
    fn provider_type(&self) -> Provider;

    /// Get the model name
    fn model_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Provider::from_str tests
    // ========================================================================

    #[test]
    fn test_from_str_all_tags() {
        assert_eq!(Provider::from_str("deepseek"), Some(Provider::DeepSeek));
        assert_eq!(Provider::from_str("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::from_str("claude"), Some(Provider::Claude));
        assert_eq!(Provider::from_str("qianwen"), Some(Provider::Qianwen));
        assert_eq!(Provider::from_str("OLLAMA_LOCAL"), Some(Provider::OllamaLocal));
    }

    #[test]
    fn test_from_str_invalid() {
        assert_eq!(Provider::from_str("gemini"), None);
        assert_eq!(Provider::from_str(""), None);
    }

    // ========================================================================
    // Provider metadata tests
    // ========================================================================

    #[test]
    fn test_api_key_env_vars() {
        assert_eq!(Provider::DeepSeek.api_key_env_var(), "DEEPSEEK_API_KEY");
        assert_eq!(Provider::OpenAi.api_key_env_var(), "OPENAI_API_KEY");
        assert_eq!(Provider::Claude.api_key_env_var(), "CLAUDE_API_KEY");
        assert_eq!(Provider::Qianwen.api_key_env_var(), "QIANWEN_API_KEY");
        assert_eq!(Provider::OllamaLocal.api_key_env_var(), "N/A");
    }

    #[test]
    fn test_ollama_local_is_localhost_with_long_timeout() {
        assert_eq!(Provider::OllamaLocal.base_url(), "http://localhost:11434");
        assert_eq!(Provider::OllamaLocal.timeout_secs(), 60);
        assert_eq!(Provider::DeepSeek.timeout_secs(), 40);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for provider in [
            Provider::DeepSeek,
            Provider::OpenAi,
            Provider::Claude,
            Provider::Qianwen,
            Provider::OllamaLocal,
        ] {
            assert_eq!(Provider::from_str(&provider.to_string()), Some(provider));
        }
    }
}
