// crates/recall-server/src/engines/vector.rs
// Vector adapter: text queries -> normalized similarity matches

use super::{RawSearchResult, SearchContext, VectorSearchOptions, VectorStore};
use crate::error::{RecallError, Result};
use crate::utils::clamp_score;
use recall_types::{VectorMatch, VectorQuery};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Adapter over the vector index.
///
/// The vector store is constructed asynchronously at startup, so a nil
/// engine is expected and is not an error: the adapter answers with an
/// empty success set so the fan-out is never starved.
pub struct VectorAdapter {
    engine: RwLock<Option<Arc<dyn VectorStore>>>,
}

impl VectorAdapter {
    pub fn new() -> Self {
        Self {
            engine: RwLock::new(None),
        }
    }

    pub fn with_engine(engine: Arc<dyn VectorStore>) -> Self {
        let adapter = Self::new();
        adapter.set_engine(engine);
        adapter
    }

    pub fn set_engine(&self, engine: Arc<dyn VectorStore>) {
        if let Ok(mut slot) = self.engine.write() {
            *slot = Some(engine);
        }
    }

    fn engine(&self) -> Option<Arc<dyn VectorStore>> {
        self.engine.read().ok().and_then(|slot| slot.clone())
    }

    /// Run one sub-query; the engine owns embedding generation
    pub async fn search(
        &self,
        query: &VectorQuery,
        ctx: &SearchContext,
    ) -> Result<Vec<VectorMatch>> {
        self.search_text(&query.text, query.similarity_threshold, query.max_results, ctx)
            .await
    }

    /// Text search with explicit threshold/limit; also used for the
    /// code-snippet lookup in the programming-context view
    pub async fn search_text(
        &self,
        text: &str,
        similarity_threshold: f64,
        max_results: usize,
        ctx: &SearchContext,
    ) -> Result<Vec<VectorMatch>> {
        let Some(engine) = self.engine() else {
            debug!("vector engine not bound, returning empty result");
            return Ok(Vec::new());
        };

        let raw = engine
            .search_by_text(
                text,
                VectorSearchOptions {
                    limit: max_results,
                    user_id: ctx.user_id.clone(),
                },
            )
            .await
            .map_err(|e| RecallError::Dimension {
                dimension: "vector",
                cause: e.to_string(),
            })?;

        let mut matches: Vec<VectorMatch> = raw
            .into_iter()
            .map(normalize)
            .filter(|m| m.similarity >= similarity_threshold)
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(max_results);
        Ok(matches)
    }
}

impl Default for VectorAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the reserved `content`/`title` fields out; everything else stays as
/// metadata
fn normalize(raw: RawSearchResult) -> VectorMatch {
    let mut fields = raw.fields;
    let title = fields
        .remove("title")
        .and_then(|v| v.as_str().map(str::to_string));
    let content = fields
        .remove("content")
        .and_then(|v| v.as_str().map(str::to_string))
        .or(title)
        .unwrap_or_default();
    let content_type = fields
        .remove("content_type")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let source = fields
        .remove("source")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "vector".to_string());

    let similarity = clamp_score(raw.score);
    VectorMatch {
        doc_id: raw.id,
        content,
        content_type,
        source,
        similarity,
        relevance_score: similarity,
        matched_segments: Vec::new(),
        metadata: fields,
    }
}
