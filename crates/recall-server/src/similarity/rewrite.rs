// crates/recall-server/src/similarity/rewrite.rs
// Query-rewrite evaluation on top of the similarity dispatcher

use super::SimilarityDispatcher;
use super::strategy::SimilarityRequest;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A rewrite is good when it stays close to the original without copying it
const GOOD_FLOOR: f64 = 0.7;
const GOOD_CEILING: f64 = 0.95;

/// Verdict on a query rewrite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteVerdict {
    pub similarity: f64,
    pub good_rewrite: bool,
    pub recommendation: String,
    /// Which strategy produced the underlying score
    pub method: String,
}

/// Evaluates `(original, rewritten)` pairs for the query-rewrite loop
pub struct RewriteEvaluator {
    dispatcher: Arc<SimilarityDispatcher>,
}

impl RewriteEvaluator {
    pub fn new(dispatcher: Arc<SimilarityDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn evaluate(&self, original: &str, rewritten: &str) -> Result<RewriteVerdict> {
        let score = self
            .dispatcher
            .compute(&SimilarityRequest::new(original, rewritten))
            .await?;

        let similarity = score.similarity;
        Ok(RewriteVerdict {
            similarity,
            good_rewrite: (GOOD_FLOOR..=GOOD_CEILING).contains(&similarity),
            recommendation: recommend(similarity).to_string(),
            method: score.method,
        })
    }
}

fn recommend(similarity: f64) -> &'static str {
    if similarity > GOOD_CEILING {
        "rewrite is a near-copy; add value or keep the original"
    } else if similarity >= GOOD_FLOOR {
        "good rewrite"
    } else if similarity >= 0.5 {
        "rewrite lost detail; tighten it"
    } else {
        "rewrite drifted from the original intent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> RewriteEvaluator {
        RewriteEvaluator::new(Arc::new(SimilarityDispatcher::standard(None)))
    }

    #[tokio::test]
    async fn test_identical_rewrite_is_not_good() {
        // similarity 1.0 sits above the 0.95 ceiling
        let verdict = evaluator()
            .evaluate("optimize the cache", "optimize the cache")
            .await
            .unwrap();
        assert_eq!(verdict.similarity, 1.0);
        assert!(!verdict.good_rewrite);
        assert!(verdict.recommendation.contains("near-copy"));
    }

    #[tokio::test]
    async fn test_unrelated_rewrite_flagged_as_drift() {
        let verdict = evaluator()
            .evaluate("optimize the cache", "schedule a meeting")
            .await
            .unwrap();
        assert!(!verdict.good_rewrite);
        assert!(verdict.recommendation.contains("drifted"));
    }

    #[test]
    fn test_recommendation_bands() {
        assert_eq!(recommend(0.99), "rewrite is a near-copy; add value or keep the original");
        assert_eq!(recommend(0.8), "good rewrite");
        assert_eq!(recommend(0.6), "rewrite lost detail; tighten it");
        assert_eq!(recommend(0.2), "rewrite drifted from the original intent");
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(recommend(GOOD_FLOOR), "good rewrite");
        assert_eq!(recommend(GOOD_CEILING), "good rewrite");
    }
}
