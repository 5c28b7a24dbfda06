// crates/recall-server/src/llm/types.rs
// Request/response types for the generate contract

use serde::{Deserialize, Serialize};

/// Requested output shape. `Json` asks the provider for structured output;
/// callers still run the response through hardened parsing because the flag
/// is a request, not a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A single generate call
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub format: OutputFormat,
}

impl GenerateRequest {
    /// JSON-output request with the engine's standard low temperature
    pub fn json(prompt: impl Into<String>, max_tokens: u32, temperature: f64) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
            format: OutputFormat::Json,
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }
}

/// Result of a generate call
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub request_id: String,
    pub content: String,
    pub usage: Option<Usage>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request_constructor() {
        let req = GenerateRequest::json("analyze this", 4000, 0.1);
        assert_eq!(req.format, OutputFormat::Json);
        assert_eq!(req.max_tokens, 4000);
        assert_eq!(req.temperature, 0.1);
    }

    #[test]
    fn test_usage_totals() {
        let usage = Usage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }
}
