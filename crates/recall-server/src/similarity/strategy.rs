// crates/recall-server/src/similarity/strategy.rs
// Strategy contract for text-similarity computation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One similarity computation
#[derive(Debug, Clone, Default)]
pub struct SimilarityRequest {
    pub original: String,
    pub candidate: String,
    /// Name of a strategy the caller insists on, if any
    pub force_strategy: Option<String>,
}

impl SimilarityRequest {
    pub fn new(original: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            candidate: candidate.into(),
            force_strategy: None,
        }
    }

    /// Combined character length of both texts
    pub fn total_len(&self) -> usize {
        self.original.chars().count() + self.candidate.chars().count()
    }
}

/// Per-facet breakdown of a similarity score, each in [0,1]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimilarityDetails {
    pub semantic: f64,
    pub lexical: f64,
    pub structural: f64,
    pub intent: f64,
    pub domain_relevance: f64,
    pub quality: f64,
}

/// Result of a similarity computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Overall similarity in [0,1]
    pub similarity: f64,
    /// Strategy confidence in its own answer, in [0,1]
    pub confidence: f64,
    /// Name of the strategy that produced the score; the dispatcher appends
    /// `_fallback` when the requested strategy was not the one that ran
    pub method: String,
    pub details: SimilarityDetails,
    pub processing_time_ms: u64,
}

/// Static description of what a strategy can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyCapabilities {
    /// Captures meaning beyond token overlap
    pub semantic: bool,
    /// Runs without network access
    pub offline: bool,
}

/// A similarity strategy. Registered once at dispatcher construction;
/// runtime selection is pure data.
#[async_trait]
pub trait SimilarityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the strategy can currently serve requests (credentials,
    /// models loaded, ...)
    fn is_available(&self) -> bool;

    fn capabilities(&self) -> StrategyCapabilities;

    async fn compute(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityScore>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_len_counts_chars() {
        let req = SimilarityRequest::new("数据库", "db");
        assert_eq!(req.total_len(), 5);
    }
}
