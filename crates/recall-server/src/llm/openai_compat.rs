// crates/recall-server/src/llm/openai_compat.rs
// One client for every OpenAI-compatible provider (DeepSeek, OpenAI,
// Qianwen via DashScope compatible mode, local Ollama)

use crate::llm::http_client::{AuthHeader, LlmHttpClient};
use crate::llm::provider::{LlmClient, Provider};
use crate::llm::types::{GenerateRequest, GenerateResult, OutputFormat, Usage};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Chat-completions client parameterized by provider. Auth, base URL,
/// timeout, and default model all come from the provider tag.
pub struct OpenAiCompatClient {
    provider: Provider,
    base_url: String,
    api_key: Option<String>,
    model: String,
    http: LlmHttpClient,
}

impl OpenAiCompatClient {
    /// Build a client for a keyed provider (deepseek, openai, qianwen)
    pub fn new(provider: Provider, api_key: String) -> Self {
        Self::with_model(provider, Some(api_key), provider.default_model().into())
    }

    /// Build the local Ollama client; skips the API-key check entirely
    pub fn ollama_local() -> Self {
        Self::with_model(
            Provider::OllamaLocal,
            None,
            Provider::OllamaLocal.default_model().into(),
        )
    }

    pub fn with_model(provider: Provider, api_key: Option<String>, model: String) -> Self {
        let http = LlmHttpClient::new(Duration::from_secs(provider.timeout_secs()));
        Self {
            provider,
            base_url: provider.base_url().to_string(),
            api_key,
            model,
            http,
        }
    }

    fn auth(&self) -> AuthHeader {
        match &self.api_key {
            Some(key) => AuthHeader::Bearer(key.clone()),
            None => AuthHeader::None,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResult> {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let wire = WireRequest {
            model: &self.model,
            messages: vec![WireMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
            response_format: match request.format {
                OutputFormat::Json => Some(WireResponseFormat {
                    format_type: "json_object",
                }),
                OutputFormat::Text => None,
            },
        };
        let body = serde_json::to_string(&wire)?;
        debug!(request_id = %request_id, provider = %self.provider, "LLM request prepared");

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response_body = self
            .http
            .post_json(&request_id, &url, &self.auth(), body)
            .await?;

        let parsed: WireResponse = serde_json::from_str(&response_body)
            .map_err(|e| anyhow!("malformed {} response: {}", self.provider, e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("{} response had no content", self.provider))?;

        let usage = parsed
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(u) = usage {
            info!(
                request_id = %request_id,
                provider = %self.provider,
                model = %self.model,
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                duration_ms,
                "LLM call finished"
            );
        }

        Ok(GenerateResult {
            request_id,
            content,
            usage,
            duration_ms,
        })
    }

    fn provider_type(&self) -> Provider {
        self.provider
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Client construction
    // ========================================================================

    #[test]
    fn test_new_uses_provider_default_model() {
        let client = OpenAiCompatClient::new(Provider::DeepSeek, "key".into());
        assert_eq!(client.model_name(), "deepseek-chat");
        assert_eq!(client.provider_type(), Provider::DeepSeek);
    }

    #[test]
    fn test_ollama_local_has_no_key() {
        let client = OpenAiCompatClient::ollama_local();
        assert!(client.api_key.is_none());
        assert_eq!(client.base_url, "http://localhost:11434");
        assert!(matches!(client.auth(), AuthHeader::None));
    }

    #[test]
    fn test_with_model_override() {
        let client =
            OpenAiCompatClient::with_model(Provider::Qianwen, Some("key".into()), "qwen-max".into());
        assert_eq!(client.model_name(), "qwen-max");
    }

    // ========================================================================
    // Wire format
    // ========================================================================

    #[test]
    fn test_json_format_requests_json_object() {
        let wire = WireRequest {
            model: "m",
            messages: vec![WireMessage {
                role: "user",
                content: "p",
            }],
            max_tokens: 100,
            temperature: 0.1,
            stream: false,
            response_format: Some(WireResponseFormat {
                format_type: "json_object",
            }),
        };
        let body = serde_json::to_string(&wire).unwrap();
        assert!(body.contains("\"response_format\":{\"type\":\"json_object\"}"));
    }

    #[test]
    fn test_response_parse() {
        let body = r#"{
            "choices": [{"message": {"content": "{\"ok\": true}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: WireResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"ok\": true}")
        );
        assert_eq!(parsed.usage.as_ref().map(|u| u.prompt_tokens), Some(10));
    }
}
