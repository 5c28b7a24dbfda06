// crates/recall-server/src/similarity/basic.rs
// Plain Jaccard overlap; the strategy of last resort

use super::strategy::{
    SimilarityDetails, SimilarityRequest, SimilarityScore, SimilarityStrategy,
    StrategyCapabilities,
};
use crate::utils::{keyword_bag, jaccard};
use async_trait::async_trait;
use std::time::Instant;

pub struct BasicLocalStrategy;

#[async_trait]
impl SimilarityStrategy for BasicLocalStrategy {
    fn name(&self) -> &'static str {
        "basic-local"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities {
            semantic: false,
            offline: true,
        }
    }

    async fn compute(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityScore> {
        let started = Instant::now();
        let a = keyword_bag(&request.original);
        let b = keyword_bag(&request.candidate);
        let overlap = jaccard(&a, &b);

        let longer = a.len().max(b.len());
        let structural = if longer == 0 {
            1.0
        } else {
            a.len().min(b.len()) as f64 / longer as f64
        };

        Ok(SimilarityScore {
            similarity: overlap,
            confidence: 0.5,
            method: self.name().to_string(),
            details: SimilarityDetails {
                semantic: overlap,
                lexical: overlap,
                structural,
                intent: overlap,
                domain_relevance: 0.0,
                quality: 0.5,
            },
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}
