// crates/recall-server/src/retrieval/enrich.rs
// Sub-query de-duplication and per-backend query enrichment

use crate::utils::text_jaccard;

/// Which backend a query text is being prepared for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Timeline,
    Knowledge,
    Vector,
    /// Current-session lookups (short-term memory path)
    Context,
}

/// Two enriched texts this close are the same query
pub const SEMANTIC_DEDUP_THRESHOLD: f64 = 0.8;

const KNOWLEDGE_PREFIX: &str = "相关概念 ";
const CONTEXT_PREFIX: &str = "当前会话 ";

/// A query already carrying one of these needs no concept prefix
const CONCEPT_MARKERS: &[&str] = &["相关概念", "概念", "concept", "knowledge"];
/// A query already carrying one of these needs no session prefix
const SESSION_MARKERS: &[&str] = &["当前会话", "会话", "session"];

/// Apply the per-backend enrichment rule.
///
/// Timeline is deliberately left untouched: the event store's full-text
/// search is AND-conjunctive, and a prepended "history activity" phrase
/// would filter everything out.
pub fn enrich_query(kind: QueryKind, text: &str, cjk_enrichment: bool) -> String {
    if !cjk_enrichment {
        return text.to_string();
    }
    let lower = text.to_lowercase();
    match kind {
        QueryKind::Timeline | QueryKind::Vector => text.to_string(),
        QueryKind::Knowledge => {
            if CONCEPT_MARKERS.iter().any(|m| lower.contains(m)) {
                text.to_string()
            } else {
                format!("{}{}", KNOWLEDGE_PREFIX, text)
            }
        }
        QueryKind::Context => {
            if SESSION_MARKERS.iter().any(|m| lower.contains(m)) {
                text.to_string()
            } else {
                format!("{}{}", CONTEXT_PREFIX, text)
            }
        }
    }
}

/// Drop exact duplicates, compared case-insensitively; the first (highest
/// priority) occurrence wins. Returns the surviving indices.
pub fn dedup_exact(texts: &[String]) -> Vec<usize> {
    let mut seen: Vec<String> = Vec::new();
    let mut keep = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let folded = text.trim().to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            keep.push(i);
        }
    }
    keep
}

/// Drop near-duplicates by pairwise Jaccard over keyword bags; earlier
/// entries win. Returns the surviving indices into `texts`.
pub fn dedup_semantic(texts: &[String]) -> Vec<usize> {
    let mut keep: Vec<usize> = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let duplicate = keep
            .iter()
            .any(|&j| text_jaccard(&texts[j], text) >= SEMANTIC_DEDUP_THRESHOLD);
        if !duplicate {
            keep.push(i);
        }
    }
    keep
}
