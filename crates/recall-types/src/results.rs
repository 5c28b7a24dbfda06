// crates/recall-types/src/results.rs
// Normalized retrieval results from the three backend dimensions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Outcome of a single retrieval dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionStatus {
    Success,
    PartialFailure,
    Failure,
}

impl DimensionStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure)
    }
}

/// Normalized event from the timeline store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_id: String,
    pub event_type: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub related_files: Vec<String>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// How important the event was when recorded, in [0,1]
    pub importance_score: f64,
    /// How relevant the event is to this query, in [0,1]
    pub relevance_score: f64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Direction of a relationship relative to its owning node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirection {
    Incoming,
    Outgoing,
}

/// Edge strength bucket used when presenting relationships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthBucket {
    Strong,
    Medium,
    Weak,
    Minimal,
}

impl StrengthBucket {
    pub fn from_strength(strength: f64) -> Self {
        if strength >= 0.8 {
            Self::Strong
        } else if strength >= 0.5 {
            Self::Medium
        } else if strength >= 0.2 {
            Self::Weak
        } else {
            Self::Minimal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Medium => "medium",
            Self::Weak => "weak",
            Self::Minimal => "minimal",
        }
    }
}

/// Relationship between two concepts, tagged with the direction it has from
/// the node that carries it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRelationship {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub start: String,
    pub end: String,
    /// Edge strength in [0,1]
    pub strength: f64,
    pub direction: RelationDirection,
}

impl KnowledgeRelationship {
    pub fn bucket(&self) -> StrengthBucket {
        StrengthBucket::from_strength(self.strength)
    }
}

/// Node from the knowledge-graph expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub concept_id: String,
    pub concept_name: String,
    pub concept_type: String,
    #[serde(default)]
    pub description: String,
    /// Ids of other nodes in the same result set; never dangling
    #[serde(default)]
    pub related_concepts: Vec<String>,
    pub relevance_score: f64,
    pub confidence_score: f64,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// A knowledge node together with the relationship subset that has the node
/// as either endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub node: KnowledgeNode,
    #[serde(default)]
    pub relationships: Vec<KnowledgeRelationship>,
}

/// Normalized match from the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub doc_id: String,
    pub content: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub source: String,
    /// Cosine similarity in [0,1]
    pub similarity: f64,
    pub relevance_score: f64,
    #[serde(default)]
    pub matched_segments: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// One dimension's results plus its status and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionResult<T> {
    pub items: Vec<T>,
    pub status: DimensionStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> DimensionResult<T> {
    pub fn empty_success() -> Self {
        Self {
            items: Vec::new(),
            status: DimensionStatus::Success,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn failure(cause: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            items: Vec::new(),
            status: DimensionStatus::Failure,
            duration_ms,
            error: Some(cause.into()),
        }
    }
}

/// Combined wide-recall output across all three dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResults {
    pub timeline: DimensionResult<TimelineEvent>,
    pub knowledge: DimensionResult<KnowledgeHit>,
    pub vector: DimensionResult<VectorMatch>,
    /// Weighted blend of per-dimension mean scores, in [0,1]
    pub overall_quality: f64,
    pub total_duration_ms: u64,
}

impl RetrievalResults {
    pub fn is_empty(&self) -> bool {
        self.timeline.items.is_empty()
            && self.knowledge.items.is_empty()
            && self.vector.items.is_empty()
    }
}

/// Dimension of a semantic change reported by the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDimension {
    Topic,
    Project,
    Code,
    Conversation,
}

/// How the session drifted on one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Shift,
    Expand,
    Refine,
    Contradict,
}

/// Projection of a timeline event returned by the time-recall fast path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRecallEvent {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub related_files: Vec<String>,
    pub related_concepts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    pub intent: String,
    pub keywords: Vec<String>,
    pub relevance_score: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&TimelineEvent> for TimeRecallEvent {
    fn from(event: &TimelineEvent) -> Self {
        Self {
            title: event.title.clone(),
            content: event.content.clone(),
            summary: event.summary.clone(),
            related_files: event.related_files.clone(),
            related_concepts: event.related_concepts.clone(),
            parent_event_id: event.parent_event_id.clone(),
            intent: event.intent.clone(),
            keywords: event.keywords.clone(),
            relevance_score: event.relevance_score,
            created_at: event.timestamp,
        }
    }
}
