// crates/recall-server/src/llm/claude.rs
// Claude API client (Anthropic messages wire format)

use crate::llm::http_client::{AuthHeader, LlmHttpClient};
use crate::llm::provider::{LlmClient, Provider};
use crate::llm::types::{GenerateRequest, GenerateResult, OutputFormat, Usage};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    content: Vec<WireBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Claude client. The messages API has no response_format switch, so a JSON
/// request is enforced by a trailing instruction line instead.
pub struct ClaudeClient {
    api_key: String,
    model: String,
    http: LlmHttpClient,
}

impl ClaudeClient {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, Provider::Claude.default_model().into())
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        let http = LlmHttpClient::new(Duration::from_secs(Provider::Claude.timeout_secs()));
        Self {
            api_key,
            model,
            http,
        }
    }
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResult> {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let prompt = match request.format {
            OutputFormat::Json => format!(
                "{}\n\nRespond with a single JSON object and nothing else.",
                request.prompt
            ),
            OutputFormat::Text => request.prompt.clone(),
        };

        let wire = WireRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![WireMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let body = serde_json::to_string(&wire)?;

        let url = format!("{}/v1/messages", Provider::Claude.base_url());
        let auth = AuthHeader::XApiKey(self.api_key.clone());
        let response_body = self.http.post_json(&request_id, &url, &auth, body).await?;

        let parsed: WireResponse = serde_json::from_str(&response_body)
            .map_err(|e| anyhow!("malformed claude response: {}", e))?;
        let content = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(anyhow!("claude response had no text blocks"));
        }

        let usage = parsed
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens));
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            request_id = %request_id,
            model = %self.model,
            duration_ms,
            "Claude call finished"
        );

        Ok(GenerateResult {
            request_id,
            content,
            usage,
            duration_ms,
        })
    }

    fn provider_type(&self) -> Provider {
        Provider::Claude
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let client = ClaudeClient::new("key".into());
        assert_eq!(client.model_name(), Provider::Claude.default_model());
        assert_eq!(client.provider_type(), Provider::Claude);
    }

    #[test]
    fn test_response_parse_joins_text_blocks() {
        let body = r#"{
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "text", "text": " 1}"}
            ],
            "usage": {"input_tokens": 7, "output_tokens": 3}
        }"#;
        let parsed: WireResponse = serde_json::from_str(body).unwrap();
        let joined: String = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(joined, "{\"a\": 1}");
    }
}
