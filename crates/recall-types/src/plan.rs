// crates/recall-types/src/plan.rs
// Intent plan produced by the analyzer: per-backend sub-queries plus metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the user is fundamentally trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoreIntent {
    #[default]
    Query,
    Command,
    Analysis,
    Review,
    Planning,
    Learning,
}

/// Broad category of the intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    #[default]
    Technical,
    Project,
    Business,
    Troubleshooting,
}

/// Urgency signal extracted by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    #[default]
    Medium,
    Low,
}

fn default_priority() -> u8 {
    3
}

/// Absolute time window marking the query as a time-window recall.
///
/// Both bounds are `YYYY-MM-DD HH:MM:SS` strings as emitted by the analyzer;
/// the orchestrator parses and validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeRecall {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl TimeRecall {
    /// A time recall is only actionable when both bounds are present
    pub fn is_empty(&self) -> bool {
        self.start_time.trim().is_empty() || self.end_time.trim().is_empty()
    }
}

/// Sub-query against the timeline event store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineQuery {
    pub text: String,
    /// Explicit window start; mutually exclusive with `time_window`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Explicit window end; mutually exclusive with `time_window`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Relative window such as "7 days"; adapters default to "30 days"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl TimelineQuery {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_time: None,
            end_time: None,
            time_window: None,
            event_types: Vec::new(),
            max_results: None,
            priority: default_priority(),
        }
    }
}

/// Sub-query against the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    pub text: String,
    #[serde(default)]
    pub concept_types: Vec<String>,
    #[serde(default)]
    pub relation_types: Vec<String>,
    /// Expansion depth, clamped to 3 by the adapter
    #[serde(default = "KnowledgeQuery::default_depth")]
    pub max_depth: u8,
    /// Minimum edge strength, floored at 0.1 by the adapter
    #[serde(default = "KnowledgeQuery::default_strength")]
    pub min_strength: f64,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl KnowledgeQuery {
    fn default_depth() -> u8 {
        2
    }

    fn default_strength() -> f64 {
        0.1
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            concept_types: Vec::new(),
            relation_types: Vec::new(),
            max_depth: Self::default_depth(),
            min_strength: Self::default_strength(),
            priority: default_priority(),
        }
    }
}

/// Sub-query against the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorQuery {
    pub text: String,
    #[serde(default = "VectorQuery::default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "VectorQuery::default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl VectorQuery {
    fn default_threshold() -> f64 {
        0.5
    }

    fn default_max_results() -> usize {
        10
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            similarity_threshold: Self::default_threshold(),
            max_results: Self::default_max_results(),
            priority: default_priority(),
        }
    }
}

/// Structured retrieval plan produced by the intent analyzer.
///
/// One plan drives the whole wide-recall fan-out: each sub-query list maps to
/// one backend, and `time_recall` (when non-empty) routes the request onto
/// the fast path that skips synthesis entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IntentPlan {
    #[serde(default)]
    pub core_intent: CoreIntent,
    #[serde(default)]
    pub intent_category: IntentCategory,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_scope: Option<String>,
    #[serde(default)]
    pub timeline_queries: Vec<TimelineQuery>,
    #[serde(default)]
    pub knowledge_queries: Vec<KnowledgeQuery>,
    #[serde(default)]
    pub vector_queries: Vec<VectorQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_recall: Option<TimeRecall>,
}

impl IntentPlan {
    /// Minimal fallback plan: one sub-query per backend from the raw query
    /// text. Used whenever the analyzer call fails or returns unparseable
    /// JSON.
    pub fn basic(query: &str) -> Self {
        Self {
            core_intent: CoreIntent::Query,
            intent_category: IntentCategory::Technical,
            key_concepts: Vec::new(),
            urgency: Urgency::Medium,
            time_scope: None,
            timeline_queries: vec![TimelineQuery::from_text(query)],
            knowledge_queries: vec![KnowledgeQuery::from_text(query)],
            vector_queries: vec![VectorQuery::from_text(query)],
            time_recall: None,
        }
    }

    /// Whether this plan requests the time-recall fast path
    pub fn wants_time_recall(&self) -> bool {
        self.time_recall.as_ref().is_some_and(|tr| !tr.is_empty())
    }
}
