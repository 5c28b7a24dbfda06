// crates/recall-types/src/context.rs
// Unified per-session context model: topic, project, code, conversation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A key concept attached to the current topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConcept {
    pub name: String,
    #[serde(rename = "type")]
    pub concept_type: String,
    #[serde(default)]
    pub definition: String,
    /// Importance in [0,1]
    pub importance: f64,
}

/// What the session is currently about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TopicContext {
    #[serde(default)]
    pub main_topic: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub user_intent: String,
    #[serde(default)]
    pub primary_pain_point: String,
    #[serde(default)]
    pub expected_outcome: String,
    #[serde(default)]
    pub key_concepts: Vec<KeyConcept>,
    /// Confidence in [0,1]
    #[serde(default)]
    pub confidence_level: f64,
    #[serde(default)]
    pub update_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Project-level facts the synthesizer has established
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub project_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub primary_language: String,
    #[serde(default)]
    pub current_phase: String,
    #[serde(default)]
    pub confidence_level: f64,
}

/// Code activity the session has touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodeActivity {
    #[serde(default)]
    pub active_files: Vec<String>,
    #[serde(default)]
    pub recent_edits: Vec<String>,
    #[serde(default)]
    pub focused_components: Vec<String>,
    #[serde(default)]
    pub key_functions: Vec<String>,
    #[serde(default)]
    pub important_types: Vec<String>,
}

/// One record per live `(user_id, session_id)` pair.
///
/// Tree-shaped by design: sub-contexts never hold back-references to their
/// owning session; session identifiers are the only join key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedContext {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub current_topic: TopicContext,
    #[serde(default)]
    pub project: ProjectProfile,
    #[serde(default)]
    pub code: CodeActivity,
    #[serde(default)]
    pub recent_changes_summary: String,
    #[serde(default)]
    pub conversation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnifiedContext {
    /// Fresh, empty context for a session
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            current_topic: TopicContext::default(),
            project: ProjectProfile::default(),
            code: CodeActivity::default(),
            recent_changes_summary: String::new(),
            conversation: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebind ownership fields to the request that produced this context.
    ///
    /// The synthesizer is never trusted to echo identifiers; callers
    /// overwrite them after every synthesis.
    pub fn rebind(&mut self, session_id: &str, user_id: &str, workspace_id: &str) {
        self.session_id = session_id.to_string();
        self.user_id = user_id.to_string();
        self.workspace_id = workspace_id.to_string();
    }
}
