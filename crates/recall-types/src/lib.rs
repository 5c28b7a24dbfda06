// crates/recall-types/src/lib.rs

//! Shared data contracts for the Recall context-retrieval engine.
//!
//! This crate provides the domain model exchanged between the server and its
//! collaborators:
//! - **Intent plans**: the structured output of the intent analyzer
//! - **Retrieval results**: normalized hits from the timeline, knowledge, and
//!   vector backends
//! - **Unified context**: the per-session structured memory
//! - **Requests/responses**: the public retrieval surface
//! - **Session snapshots**: the editor-side records the programming-context
//!   extractor consumes
//!
//! Types here are pure serde contracts with no native-only dependencies.

mod context;
mod plan;
mod response;
mod results;
mod snapshot;

pub use context::{
    CodeActivity, KeyConcept, ProjectProfile, TopicContext, UnifiedContext,
};
pub use plan::{
    CoreIntent, IntentCategory, IntentPlan, KnowledgeQuery, TimeRecall, TimelineQuery, Urgency,
    VectorQuery,
};
pub use response::{ContextRequest, ContextResponse, SemanticChange, SynthesisEvaluation};
pub use results::{
    ChangeDimension, ChangeType, DimensionResult, DimensionStatus, KnowledgeHit, KnowledgeNode,
    KnowledgeRelationship, RelationDirection, RetrievalResults, StrengthBucket, TimeRecallEvent,
    TimelineEvent, VectorMatch,
};
pub use snapshot::{DecisionLink, DesignDecision, EditKind, EditRecord, FileAssociation, SessionSnapshot};
