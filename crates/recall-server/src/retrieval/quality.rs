// crates/recall-server/src/retrieval/quality.rs
// Overall retrieval quality: weighted blend of per-dimension mean scores

use recall_types::{DimensionResult, KnowledgeHit, TimelineEvent, VectorMatch};

const TIMELINE_WEIGHT: f64 = 0.3;
const KNOWLEDGE_WEIGHT: f64 = 0.3;
const VECTOR_WEIGHT: f64 = 0.4;

/// Blend the three dimension means, rescaled by the weights of the
/// dimensions that actually succeeded. Zero successful dimensions means
/// zero quality.
pub fn overall_quality(
    timeline: &DimensionResult<TimelineEvent>,
    knowledge: &DimensionResult<KnowledgeHit>,
    vector: &DimensionResult<VectorMatch>,
) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;

    if timeline.status.is_success() {
        weighted += mean(timeline.items.iter().map(|e| {
            (e.importance_score + e.relevance_score) / 2.0
        })) * TIMELINE_WEIGHT;
        weight_sum += TIMELINE_WEIGHT;
    }
    if knowledge.status.is_success() {
        weighted += mean(knowledge.items.iter().map(|h| {
            (h.node.relevance_score + h.node.confidence_score) / 2.0
        })) * KNOWLEDGE_WEIGHT;
        weight_sum += KNOWLEDGE_WEIGHT;
    }
    if vector.status.is_success() {
        weighted += mean(vector.items.iter().map(|m| {
            (m.similarity + m.relevance_score) / 2.0
        })) * VECTOR_WEIGHT;
        weight_sum += VECTOR_WEIGHT;
    }

    if weight_sum == 0.0 {
        return 0.0;
    }
    (weighted / weight_sum).clamp(0.0, 1.0)
}

fn mean(scores: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for score in scores {
        sum += score;
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}
