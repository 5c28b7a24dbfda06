// crates/recall-server/src/engines/mod.rs
// Backend engine contracts and the adapters that normalize their results.
//
// The engines themselves (storage, indexing, query semantics) are external
// collaborators; this module defines only the request/response contracts the
// core consumes, and adapters that translate uniform sub-queries into them.

mod knowledge;
mod timeline;
mod vector;

pub use knowledge::KnowledgeAdapter;
pub use timeline::TimelineAdapter;
pub use vector::VectorAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recall_types::{KnowledgeNode, TimelineEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Ambient identifiers and plan-level data shared by every adapter call
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub user_id: String,
    pub workspace_id: String,
    /// Concept list extracted by the intent analyzer. Adapters use this as
    /// the keyword set; they never re-tokenize the raw query.
    pub key_concepts: Vec<String>,
    /// Time-recall requests bypass relevance filtering
    pub time_recall: bool,
}

/// Native query against the timeline event store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSearchRequest {
    pub user_id: String,
    pub workspace_id: String,
    pub text: String,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Relative window such as "30 days"; used when no explicit bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
    pub event_types: Vec<String>,
    pub limit: usize,
    pub min_relevance: f64,
    pub order_by: String,
}

/// Timeline event store. Empty `text` with a non-empty window is legal and
/// returns every event in the window.
#[async_trait]
pub trait TimelineStore: Send + Sync {
    async fn search(&self, request: TimelineSearchRequest) -> anyhow::Result<Vec<TimelineEvent>>;
}

/// Native expansion request against the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeExpandRequest {
    pub user_id: String,
    pub text: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub max_depth: u8,
    pub min_strength: f64,
    pub limit: usize,
    pub query_type: String,
}

/// Undirected edge as stored in the graph; adapters re-tag it with a
/// direction relative to each emitted node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub start: String,
    pub end: String,
    pub strength: f64,
}

/// Raw graph expansion result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeExpansion {
    pub nodes: Vec<KnowledgeNode>,
    pub relationships: Vec<GraphEdge>,
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn expand(&self, request: KnowledgeExpandRequest) -> anyhow::Result<KnowledgeExpansion>;
}

/// Options for a text search against the vector index
#[derive(Debug, Clone)]
pub struct VectorSearchOptions {
    pub limit: usize,
    pub user_id: String,
}

/// Raw vector hit: `fields.content` and `fields.title` are reserved keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSearchResult {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

/// Vector index. The engine owns embedding generation; callers only pass
/// text.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search_by_text(
        &self,
        text: &str,
        options: VectorSearchOptions,
    ) -> anyhow::Result<Vec<RawSearchResult>>;
}
