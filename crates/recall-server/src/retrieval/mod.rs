// crates/recall-server/src/retrieval/mod.rs
// Parallel wide-recall: fan the plan out across the three backends under
// per-dimension deadlines, tolerate partial failure, score the whole.

mod enrich;
mod quality;

pub use enrich::{QueryKind, SEMANTIC_DEDUP_THRESHOLD, dedup_exact, dedup_semantic, enrich_query};
pub use quality::overall_quality;

use crate::engines::{KnowledgeAdapter, SearchContext, TimelineAdapter, VectorAdapter};
use crate::error::Result;
use recall_types::{DimensionResult, DimensionStatus, IntentPlan, RetrievalResults};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Settings for one retriever instance
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Deadline covering each whole dimension
    pub backend_timeout: Duration,
    pub cjk_enrichment: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(5),
            cjk_enrichment: true,
        }
    }
}

/// Fans sub-queries out to the three adapters. The dimensions always run
/// concurrently and never cancel each other; a slow backend only loses its
/// own deadline.
pub struct ParallelRetriever {
    timeline: Arc<TimelineAdapter>,
    knowledge: Arc<KnowledgeAdapter>,
    vector: Arc<VectorAdapter>,
    config: RetrievalConfig,
}

impl ParallelRetriever {
    pub fn new(
        timeline: Arc<TimelineAdapter>,
        knowledge: Arc<KnowledgeAdapter>,
        vector: Arc<VectorAdapter>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            timeline,
            knowledge,
            vector,
            config,
        }
    }

    /// Execute the plan. Returns after the last dimension completes or its
    /// deadline fires; per-call failures are folded into dimension statuses.
    pub async fn retrieve(&self, plan: &IntentPlan, ctx: &SearchContext) -> RetrievalResults {
        let started = Instant::now();

        let timeline_queries = prepare(
            &plan.timeline_queries,
            |q| q.priority,
            |q| q.text.clone(),
            QueryKind::Timeline,
            self.config.cjk_enrichment,
            |q, text| {
                let mut q = q.clone();
                q.text = text;
                q
            },
        );
        let knowledge_queries = prepare(
            &plan.knowledge_queries,
            |q| q.priority,
            |q| q.text.clone(),
            QueryKind::Knowledge,
            self.config.cjk_enrichment,
            |q, text| {
                let mut q = q.clone();
                q.text = text;
                q
            },
        );
        let vector_queries = prepare(
            &plan.vector_queries,
            |q| q.priority,
            |q| q.text.clone(),
            QueryKind::Vector,
            self.config.cjk_enrichment,
            |q, text| {
                let mut q = q.clone();
                q.text = text;
                q
            },
        );

        let budget = self.config.backend_timeout;
        let (timeline, knowledge, vector) = tokio::join!(
            run_dimension("timeline", budget, timeline_queries, |q| {
                let adapter = Arc::clone(&self.timeline);
                async move { adapter.search(&q, ctx).await }
            }),
            run_dimension("knowledge", budget, knowledge_queries, |q| {
                let adapter = Arc::clone(&self.knowledge);
                async move { adapter.search(&q, ctx).await }
            }),
            run_dimension("vector", budget, vector_queries, |q| {
                let adapter = Arc::clone(&self.vector);
                async move { adapter.search(&q, ctx).await }
            }),
        );

        let overall_quality = overall_quality(&timeline, &knowledge, &vector);
        RetrievalResults {
            timeline,
            knowledge,
            vector,
            overall_quality,
            total_duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Sort by priority, drop exact then semantic duplicates, enrich the texts
fn prepare<Q: Clone>(
    queries: &[Q],
    priority_of: impl Fn(&Q) -> u8,
    text_of: impl Fn(&Q) -> String,
    kind: QueryKind,
    cjk_enrichment: bool,
    rebuild: impl Fn(&Q, String) -> Q,
) -> Vec<Q> {
    let mut sorted: Vec<&Q> = queries.iter().collect();
    sorted.sort_by_key(|q| priority_of(q));

    let texts: Vec<String> = sorted.iter().map(|q| text_of(q)).collect();
    let kept = dedup_exact(&texts);

    let enriched: Vec<String> = kept
        .iter()
        .map(|&i| enrich_query(kind, &texts[i], cjk_enrichment))
        .collect();
    let surviving = dedup_semantic(&enriched);

    surviving
        .into_iter()
        .map(|j| rebuild(sorted[kept[j]], enriched[j].clone()))
        .collect()
}

/// Run one dimension's sub-queries sequentially in priority order under a
/// shared deadline. Accumulated results survive a deadline expiry.
async fn run_dimension<Q, T, F, Fut>(
    dimension: &'static str,
    budget: Duration,
    queries: Vec<Q>,
    search: F,
) -> DimensionResult<T>
where
    F: Fn(Q) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let started = Instant::now();
    let deadline = started + budget;
    let mut items: Vec<T> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for query in queries {
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            errors.push("deadline exceeded".to_string());
            break;
        };
        match tokio::time::timeout(remaining, search(query)).await {
            Ok(Ok(mut found)) => items.append(&mut found),
            Ok(Err(e)) => {
                warn!(dimension, cause = %e, latency_ms = started.elapsed().as_millis() as u64,
                      "sub-query failed");
                errors.push(e.to_string());
            }
            Err(_) => {
                warn!(dimension, latency_ms = started.elapsed().as_millis() as u64,
                      "dimension deadline expired");
                errors.push("deadline exceeded".to_string());
                break;
            }
        }
    }

    let status = if items.is_empty() {
        DimensionStatus::Failure
    } else if errors.is_empty() {
        DimensionStatus::Success
    } else {
        DimensionStatus::PartialFailure
    };

    DimensionResult {
        items,
        status,
        duration_ms: started.elapsed().as_millis() as u64,
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
    }
}
