// crates/recall-server/src/similarity/enhanced.rs
// Token-normalized overlap with domain weighting

use super::strategy::{
    SimilarityDetails, SimilarityRequest, SimilarityScore, SimilarityStrategy,
    StrategyCapabilities,
};
use crate::utils::{keyword_bag, jaccard};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Instant;

/// Terms that signal software-engineering content; matches weigh double
const DOMAIN_TERMS: &[&str] = &[
    "api", "database", "cache", "index", "query", "service", "deploy", "test", "refactor",
    "performance", "latency", "memory", "thread", "async", "error", "config", "schema",
    "架构", "算法", "性能", "数据", "缓存", "服务", "测试", "重构",
];

/// Markers that make a text read as a question
const INTENT_MARKERS: &[&str] = &[
    "how", "why", "what", "when", "where", "?", "如何", "为什么", "什么", "怎么", "？",
];

fn weight_of(token: &str) -> f64 {
    // CJK tokens are single ideographs; match them against the characters of
    // the CJK domain terms
    let is_domain = DOMAIN_TERMS.contains(&token)
        || (token.chars().count() == 1
            && !token.is_ascii()
            && DOMAIN_TERMS.iter().any(|d| !d.is_ascii() && d.contains(token)));
    if is_domain { 2.0 } else { 1.0 }
}

/// Trim trivial English morphology so "queries"/"query" overlap
fn normalize_token(token: &str) -> String {
    let t = token.strip_suffix("ies").map(|stem| format!("{}y", stem));
    if let Some(t) = t {
        return t;
    }
    token
        .strip_suffix('s')
        .filter(|stem| stem.len() > 2)
        .unwrap_or(token)
        .to_string()
}

fn normalized_bag(text: &str) -> HashSet<String> {
    keyword_bag(text)
        .into_iter()
        .map(|t| normalize_token(&t))
        .collect()
}

fn weighted_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection: f64 = a.intersection(b).map(|t| weight_of(t)).sum();
    let union: f64 = a.union(b).map(|t| weight_of(t)).sum();
    if union == 0.0 { 0.0 } else { intersection / union }
}

fn has_intent_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    INTENT_MARKERS.iter().any(|m| lower.contains(m))
}

pub struct EnhancedLocalStrategy;

#[async_trait]
impl SimilarityStrategy for EnhancedLocalStrategy {
    fn name(&self) -> &'static str {
        "enhanced-local"
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

    async fn compute(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityScore> {
        let started = Instant::now();

        let a = normalized_bag(&request.original);
        let b = normalized_bag(&request.candidate);

        let semantic = weighted_jaccard(&a, &b);
        let lexical = jaccard(&keyword_bag(&request.original), &keyword_bag(&request.candidate));

        let longer = a.len().max(b.len());
        let structural = if longer == 0 {
            1.0
        } else {
            a.len().min(b.len()) as f64 / longer as f64
        };

        let intent = if has_intent_marker(&request.original) == has_intent_marker(&request.candidate)
        {
            1.0
        } else {
            0.5
        };

        let union_size = a.union(&b).count();
        let domain_hits = a.union(&b).filter(|t| weight_of(t) > 1.0).count();
        let domain_relevance = if union_size == 0 {
            0.0
        } else {
            domain_hits as f64 / union_size as f64
        };

        let similarity = (0.6 * semantic + 0.25 * lexical + 0.15 * structural).clamp(0.0, 1.0);

        Ok(SimilarityScore {
            similarity,
            confidence: 0.7,
            method: self.name().to_string(),
            details: SimilarityDetails {
                semantic,
                lexical,
                structural,
                intent,
                domain_relevance,
                quality: (semantic + lexical) / 2.0,
            },
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}
