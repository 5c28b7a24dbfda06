// crates/recall-server/src/similarity/remote.rs
// Remote embedding strategy: network embedding API, cosine over the pair

use super::strategy::{
    SimilarityDetails, SimilarityRequest, SimilarityScore, SimilarityStrategy,
    StrategyCapabilities,
};
use crate::utils::{keyword_bag, jaccard};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    input: [&'a str; 2],
}

#[derive(Deserialize)]
struct WireResponse {
    data: Vec<WireEmbedding>,
}

#[derive(Deserialize)]
struct WireEmbedding {
    embedding: Vec<f64>,
}

/// Network embedding strategy. Unavailable without an API key, in which
/// case the dispatcher never selects it.
pub struct RemoteEmbeddingStrategy {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RemoteEmbeddingStrategy {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT.into(), DEFAULT_MODEL.into(), api_key)
    }

    pub fn with_endpoint(endpoint: String, model: String, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            endpoint,
            model,
            api_key,
            client,
        }
    }
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return if norm_a == norm_b { 1.0 } else { 0.0 };
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[async_trait]
impl SimilarityStrategy for RemoteEmbeddingStrategy {
    fn name(&self) -> &'static str {
        "remote-embedding"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities {
            semantic: true,
            offline: false,
        }
    }

    async fn compute(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityScore> {
        let Some(ref api_key) = self.api_key else {
            anyhow::bail!("remote-embedding strategy has no API key");
        };
        let started = Instant::now();

        let wire = WireRequest {
            model: &self.model,
            input: [&request.original, &request.candidate],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&wire)
            .send()
            .await?
            .error_for_status()?;
        let parsed: WireResponse = response.json().await?;
        if parsed.data.len() < 2 {
            anyhow::bail!(
                "embedding API returned {} vectors, expected 2",
                parsed.data.len()
            );
        }

        let semantic = cosine(&parsed.data[0].embedding, &parsed.data[1].embedding);
        let lexical = jaccard(&keyword_bag(&request.original), &keyword_bag(&request.candidate));

        Ok(SimilarityScore {
            similarity: semantic,
            confidence: 0.9,
            method: self.name().to_string(),
            details: SimilarityDetails {
                semantic,
                lexical,
                structural: lexical,
                intent: semantic,
                domain_relevance: 0.0,
                quality: (semantic + lexical) / 2.0,
            },
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_without_key() {
        let strategy = RemoteEmbeddingStrategy::new(None);
        assert!(!strategy.is_available());
    }

    #[test]
    fn test_available_with_key() {
        let strategy = RemoteEmbeddingStrategy::new(Some("key".into()));
        assert!(strategy.is_available());
        assert!(!strategy.capabilities().offline);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.5, 0.5, 0.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }
}
