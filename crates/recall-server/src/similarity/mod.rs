// crates/recall-server/src/similarity/mod.rs
// Similarity strategy dispatch with availability-aware fallback

mod basic;
mod embedding;
mod enhanced;
mod remote;
mod rewrite;
mod strategy;

pub use basic::BasicLocalStrategy;
pub use embedding::EmbeddingLocalStrategy;
pub use enhanced::EnhancedLocalStrategy;
pub use remote::RemoteEmbeddingStrategy;
pub use rewrite::{RewriteEvaluator, RewriteVerdict};
pub use strategy::{
    SimilarityDetails, SimilarityRequest, SimilarityScore, SimilarityStrategy,
    StrategyCapabilities,
};

use crate::error::{RecallError, Result};
use std::sync::Arc;
use tracing::warn;

/// Texts whose vocabulary reads as complex semantics prefer the remote
/// strategy even below the length threshold
const COMPLEX_SEMANTICS_VOCAB: &[&str] = &[
    "technical", "algorithm", "architecture", "microservices", "distributed", "concurrency",
    "optimization", "refactor", "架构", "算法", "性能",
];

/// Combined length at which texts prefer the remote embedding strategy
const REMOTE_LENGTH_THRESHOLD: usize = 500;

const DEFAULT_FALLBACK: &str = "basic-local";

/// Dispatcher over the registered strategies. The table is built once at
/// startup; runtime selection is pure data.
pub struct SimilarityDispatcher {
    strategies: Vec<Arc<dyn SimilarityStrategy>>,
    fallback_name: String,
}

impl SimilarityDispatcher {
    pub fn new(strategies: Vec<Arc<dyn SimilarityStrategy>>) -> Self {
        Self {
            strategies,
            fallback_name: DEFAULT_FALLBACK.to_string(),
        }
    }

    /// Standard registry: all four strategies. The remote strategy is only
    /// selectable when an embeddings API key is configured.
    pub fn standard(embeddings_api_key: Option<String>) -> Self {
        Self::new(vec![
            Arc::new(EnhancedLocalStrategy),
            Arc::new(BasicLocalStrategy),
            Arc::new(EmbeddingLocalStrategy::new()),
            Arc::new(RemoteEmbeddingStrategy::new(embeddings_api_key)),
        ])
    }

    pub fn with_fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    fn by_name(&self, name: &str) -> Option<Arc<dyn SimilarityStrategy>> {
        self.strategies
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    fn available(&self, name: &str) -> Option<Arc<dyn SimilarityStrategy>> {
        self.by_name(name).filter(|s| s.is_available())
    }

    /// Selection rule: forced strategy, then embedding-local, then
    /// remote-embedding for long or complex-vocabulary texts, then
    /// enhanced-local, then basic-local. Returns the chosen strategy and
    /// whether a forced request had to be redirected.
    fn select(&self, request: &SimilarityRequest) -> Option<(Arc<dyn SimilarityStrategy>, bool)> {
        if let Some(ref forced) = request.force_strategy {
            if let Some(strategy) = self.available(forced) {
                return Some((strategy, false));
            }
            warn!(strategy = %forced, "forced similarity strategy unavailable, reselecting");
            return self.select_default(request).map(|s| (s, true));
        }
        self.select_default(request).map(|s| (s, false))
    }

    fn select_default(&self, request: &SimilarityRequest) -> Option<Arc<dyn SimilarityStrategy>> {
        if let Some(strategy) = self.available("embedding-local") {
            return Some(strategy);
        }
        if wants_remote(request)
            && let Some(strategy) = self.available("remote-embedding")
        {
            return Some(strategy);
        }
        self.available("enhanced-local")
            .or_else(|| self.available(DEFAULT_FALLBACK))
    }

    /// Compute similarity with fallback. Never errors while any registered
    /// strategy can still produce a score.
    pub async fn compute(&self, request: &SimilarityRequest) -> Result<SimilarityScore> {
        let Some((strategy, redirected)) = self.select(request) else {
            return Err(RecallError::Config(
                "no similarity strategy available".into(),
            ));
        };

        match strategy.compute(request).await {
            Ok(mut score) => {
                if redirected {
                    score.method = format!("{}_fallback", score.method);
                }
                Ok(score)
            }
            Err(e) => {
                warn!(
                    strategy = strategy.name(),
                    error = %e,
                    "similarity strategy failed, using fallback"
                );
                let fallback = self
                    .available(&self.fallback_name)
                    .ok_or_else(|| RecallError::Config("fallback strategy unavailable".into()))?;
                let mut score = fallback
                    .compute(request)
                    .await
                    .map_err(|e| RecallError::Other(e.to_string()))?;
                score.method = format!("{}_fallback", score.method);
                Ok(score)
            }
        }
    }
}

fn wants_remote(request: &SimilarityRequest) -> bool {
    if request.total_len() >= REMOTE_LENGTH_THRESHOLD {
        return true;
    }
    let combined = format!(
        "{} {}",
        request.original.to_lowercase(),
        request.candidate.to_lowercase()
    );
    COMPLEX_SEMANTICS_VOCAB.iter().any(|term| combined.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Always-failing strategy to drive the fallback path
    struct BrokenStrategy;

    #[async_trait]
    impl SimilarityStrategy for BrokenStrategy {
        fn name(&self) -> &'static str {
            "embedding-local"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn capabilities(&self) -> StrategyCapabilities {
            StrategyCapabilities {
                semantic: true,
                offline: true,
            }
        }
        async fn compute(&self, _request: &SimilarityRequest) -> anyhow::Result<SimilarityScore> {
            anyhow::bail!("vectorizer crashed")
        }
    }

    // ========================================================================
    // Selection rule
    // ========================================================================

    #[tokio::test]
    async fn test_embedding_local_is_default_choice() {
        let dispatcher = SimilarityDispatcher::standard(None);
        let score = dispatcher
            .compute(&SimilarityRequest::new("a b", "a b"))
            .await
            .unwrap();
        assert_eq!(score.method, "embedding-local");
    }

    #[tokio::test]
    async fn test_forced_strategy_honored_when_available() {
        let dispatcher = SimilarityDispatcher::standard(None);
        let mut req = SimilarityRequest::new("a", "a");
        req.force_strategy = Some("basic-local".into());
        let score = dispatcher.compute(&req).await.unwrap();
        assert_eq!(score.method, "basic-local");
    }

    #[tokio::test]
    async fn test_forced_unavailable_falls_to_enhanced_with_suffix() {
        // embedding-local is registered but disabled; forcing it must
        // redirect to enhanced-local and annotate the method
        let dispatcher = SimilarityDispatcher::new(vec![
            Arc::new(EnhancedLocalStrategy),
            Arc::new(BasicLocalStrategy),
            Arc::new(EmbeddingLocalStrategy::disabled()),
        ]);
        let mut req = SimilarityRequest::new("tune cache", "tune cache");
        req.force_strategy = Some("embedding-local".into());
        let score = dispatcher.compute(&req).await.unwrap();
        assert_eq!(score.method, "enhanced-local_fallback");
        assert!((score.similarity - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_remote_preferred_for_complex_vocabulary() {
        // No embedding-local registered; complex vocabulary should try the
        // remote strategy, which is unavailable without a key, landing on
        // enhanced-local
        let dispatcher = SimilarityDispatcher::new(vec![
            Arc::new(EnhancedLocalStrategy),
            Arc::new(BasicLocalStrategy),
            Arc::new(RemoteEmbeddingStrategy::new(None)),
        ]);
        let score = dispatcher
            .compute(&SimilarityRequest::new(
                "microservices architecture",
                "distributed systems",
            ))
            .await
            .unwrap();
        assert_eq!(score.method, "enhanced-local");
    }

    #[tokio::test]
    async fn test_length_threshold_triggers_remote_preference() {
        let long = "x ".repeat(300);
        let req = SimilarityRequest::new(long.clone(), long);
        assert!(wants_remote(&req));
        assert!(!wants_remote(&SimilarityRequest::new("short", "texts")));
    }

    // ========================================================================
    // Failure fallback
    // ========================================================================

    #[tokio::test]
    async fn test_strategy_failure_falls_back_without_error() {
        let dispatcher = SimilarityDispatcher::new(vec![
            Arc::new(BrokenStrategy),
            Arc::new(BasicLocalStrategy),
        ]);
        let score = dispatcher
            .compute(&SimilarityRequest::new("a b c", "a b c"))
            .await
            .unwrap();
        assert_eq!(score.method, "basic-local_fallback");
        assert_eq!(score.similarity, 1.0);
    }

    #[tokio::test]
    async fn test_empty_registry_is_config_error() {
        let dispatcher = SimilarityDispatcher::new(vec![]);
        let result = dispatcher
            .compute(&SimilarityRequest::new("a", "b"))
            .await;
        assert!(matches!(result, Err(RecallError::Config(_))));
    }
}
