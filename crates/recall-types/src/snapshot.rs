// crates/recall-types/src/snapshot.rs
// Editor-side session records consumed by the programming-context extractor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of an editor edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Modify,
    Delete,
}

impl EditKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

/// A file the editor has associated with the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAssociation {
    pub path: String,
    #[serde(default)]
    pub language: String,
    /// Source content at association time; feature extraction reads this
    #[serde(default)]
    pub content: String,
    pub associated_at: DateTime<Utc>,
}

/// One recorded edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub id: String,
    pub file_path: String,
    pub edit_type: EditKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A design decision captured during the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDecision {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub timestamp: DateTime<Utc>,
}

/// Link from a significant edit to the decision it likely implements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLink {
    pub edit_id: String,
    pub decision_id: String,
    /// Link strength in [0,1]
    pub strength: f64,
}

/// Everything the extractor needs about one session, captured at a point in
/// time. Pure input: the extractor never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub files: Vec<FileAssociation>,
    #[serde(default)]
    pub edits: Vec<EditRecord>,
    #[serde(default)]
    pub decisions: Vec<DesignDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_edit_kind_wire_format() {
        assert_eq!(serde_json::to_string(&EditKind::Modify).unwrap(), "\"modify\"");
        assert_eq!(EditKind::Delete.label(), "delete");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = SessionSnapshot {
            session_id: "s-1".into(),
            user_id: "u-1".into(),
            files: vec![FileAssociation {
                path: "src/main.go".into(),
                language: "go".into(),
                content: "package main".into(),
                associated_at: Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap(),
            }],
            edits: vec![EditRecord {
                id: "e-1".into(),
                file_path: "src/main.go".into(),
                edit_type: EditKind::Modify,
                content: "fixed the handler".into(),
                timestamp: Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap(),
            }],
            decisions: vec![],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }
}
