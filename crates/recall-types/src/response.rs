// crates/recall-types/src/response.rs
// Public retrieval surface: request carrier, synthesized response, evaluation

use crate::results::{ChangeDimension, ChangeType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Incoming retrieval request.
///
/// `workspace_path` is the raw filesystem path; the workspace id is its last
/// component and both are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequest {
    pub user_id: String,
    pub workspace_path: String,
    pub session_id: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_analysis: Option<String>,
}

impl ContextRequest {
    pub fn new(
        user_id: impl Into<String>,
        workspace_path: impl Into<String>,
        session_id: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_path: workspace_path.into(),
            session_id: session_id.into(),
            query: query.into(),
            project_analysis: None,
        }
    }

    /// Workspace name: the last component of the workspace path
    pub fn workspace_id(&self) -> String {
        Path::new(&self.workspace_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(self.workspace_path.as_str())
            .to_string()
    }
}

/// Synthesized context block returned to the upstream assistant.
/// Each field is a pre-formatted string the caller injects verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContextResponse {
    pub session_state: String,
    pub short_term_memory: String,
    pub long_term_memory: String,
    pub relevant_knowledge: String,
}

/// Per-dimension drift reported by the synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticChange {
    pub dimension: ChangeDimension,
    pub change_type: ChangeType,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// The synthesizer's verdict on whether the stored context should change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisEvaluation {
    pub should_update: bool,
    /// Confidence in [0,1]; also gates async persistence
    pub update_confidence: f64,
    #[serde(default)]
    pub evaluation_reason: String,
    #[serde(default)]
    pub semantic_changes: Vec<SemanticChange>,
}
