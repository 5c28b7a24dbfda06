// crates/recall-server/src/similarity/embedding.rs
// Local vectorizer: hashed bag-of-words embedding with an LRU query cache

use super::strategy::{
    SimilarityDetails, SimilarityRequest, SimilarityScore, SimilarityStrategy,
    StrategyCapabilities,
};
use crate::utils::{keyword_bag, jaccard};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

const DIMENSIONS: usize = 256;
const CACHE_CAPACITY: usize = 512;

/// Deterministic local vectorizer. Tokens hash into a fixed number of
/// dimensions with term counts as magnitudes; cosine similarity over the
/// result tracks lexical overlap while tolerating word order.
pub struct EmbeddingLocalStrategy {
    cache: Mutex<LruCache<String, Arc<Vec<f32>>>>,
    enabled: bool,
}

impl EmbeddingLocalStrategy {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            enabled: true,
        }
    }

    /// Construct in the unavailable state (vectorizer not loaded)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    async fn embed(&self, text: &str) -> Arc<Vec<f32>> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(vector) = cache.get(text) {
                return vector.clone();
            }
        }

        let vector = Arc::new(vectorize(text));
        let mut cache = self.cache.lock().await;
        cache.put(text.to_string(), vector.clone());
        vector
    }
}

impl Default for EmbeddingLocalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

fn vectorize(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for token in keyword_bag(text) {
        vector[fnv1a(&token) as usize % DIMENSIONS] += 1.0;
    }
    vector
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Cosine similarity; two zero vectors (both texts empty) count as identical
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(x * y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(x * x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(x * x)).sum::<f64>().sqrt();
    if norm_a == 0.0 && norm_b == 0.0 {
        return 1.0;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[async_trait]
impl SimilarityStrategy for EmbeddingLocalStrategy {
    fn name(&self) -> &'static str {
        "embedding-local"
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    fn capabilities(&self) -> StrategyCapabilities {
        StrategyCapabilities {
            semantic: true,
            offline: true,
        }
    }

    async fn compute(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityScore> {
        if !self.enabled {
            anyhow::bail!("embedding-local strategy is disabled");
        }
        let started = Instant::now();

        let a = self.embed(&request.original).await;
        let b = self.embed(&request.candidate).await;
        let semantic = cosine(&a, &b);
        let lexical = jaccard(&keyword_bag(&request.original), &keyword_bag(&request.candidate));

        Ok(SimilarityScore {
            similarity: semantic,
            confidence: 0.8,
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
