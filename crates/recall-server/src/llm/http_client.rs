// crates/recall-server/src/llm/http_client.rs
// Shared HTTP client with retry for all LLM providers

use anyhow::{Result, anyhow};
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Maximum retry attempts for transient failures
const MAX_ATTEMPTS: u32 = 3;
/// Base backoff between retries; doubles each attempt
const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Connect timeout applied to every provider
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Auth header shapes across the supported providers
pub enum AuthHeader {
    /// `Authorization: Bearer <key>` (OpenAI-compatible APIs)
    Bearer(String),
    /// `x-api-key: <key>` plus `anthropic-version` (Claude)
    XApiKey(String),
    /// No auth at all (local Ollama)
    None,
}

/// Shared HTTP transport for LLM providers: one reqwest client, uniform
/// retry on 429/5xx and connection errors.
pub struct LlmHttpClient {
    client: Client,
    max_attempts: u32,
    base_backoff: Duration,
}

impl LlmHttpClient {
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
        }
    }

    /// POST a JSON body and return the response text, retrying transient
    /// failures with exponential backoff.
    pub async fn post_json(
        &self,
        request_id: &str,
        url: &str,
        auth: &AuthHeader,
        body: String,
    ) -> Result<String> {
        let mut attempts = 0;
        let mut backoff = self.base_backoff;

        loop {
            let mut builder = self
                .client
                .post(url)
                .header("Content-Type", "application/json");
            builder = match auth {
                AuthHeader::Bearer(key) => {
                    builder.header("Authorization", format!("Bearer {}", key))
                }
                AuthHeader::XApiKey(key) => builder
                    .header("x-api-key", key.as_str())
                    .header("anthropic-version", "2023-06-01"),
                AuthHeader::None => builder,
            };

            match builder.body(body.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }

                    let error_body = response.text().await.unwrap_or_default();
                    let transient = status.as_u16() == 429 || status.is_server_error();
                    if transient && attempts < self.max_attempts {
                        warn!(
                            request_id = %request_id,
                            status = %status,
                            "Transient LLM API error, retrying in {:?}",
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        backoff *= 2;
                        continue;
                    }
                    return Err(anyhow!("API error {}: {}", status, error_body));
                }
                Err(e) => {
                    if attempts < self.max_attempts {
                        warn!(
                            request_id = %request_id,
                            error = %e,
                            "LLM request failed, retrying in {:?}",
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        backoff *= 2;
                        continue;
                    }
                    return Err(anyhow!("request failed after {} retries: {}", attempts, e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = LlmHttpClient::new(Duration::from_secs(40));
        assert_eq!(client.max_attempts, MAX_ATTEMPTS);
        assert_eq!(client.base_backoff, BASE_BACKOFF);
    }
}
