// crates/recall-server/src/programming/edits.rs
// Edit tagging, significance, and decision auto-linking

use chrono::Duration;
use recall_types::{DecisionLink, DesignDecision, EditKind, EditRecord};
use std::path::Path;

/// A significant edit auto-links to a decision made at most this long before
const LINK_WINDOW_SECS: i64 = 300;
const LINK_STRENGTH: f64 = 0.8;

const LARGE_EDIT: usize = 500;
const MEDIUM_EDIT: usize = 100;

/// Keyword tags with their localized variants
const KEYWORD_TAGS: &[(&str, &[&str])] = &[
    ("bugfix", &["bugfix", "fix", "修复"]),
    ("feature", &["feature", "功能", "新增"]),
    ("refactor", &["refactor", "重构"]),
    ("test", &["test", "测试"]),
    ("docs", &["docs", "文档"]),
];

/// Derive the tag set for an edit: type, extension, size bucket, keywords
pub fn edit_tags(edit: &EditRecord) -> Vec<String> {
    let mut tags = vec![edit.edit_type.label().to_string()];

    if let Some(ext) = Path::new(&edit.file_path)
        .extension()
        .and_then(|e| e.to_str())
    {
        tags.push(ext.to_lowercase());
    }

    let len = edit.content.chars().count();
    if len >= LARGE_EDIT {
        tags.push("large-edit".to_string());
    } else if len >= MEDIUM_EDIT {
        tags.push("medium-edit".to_string());
    } else if len > 0 {
        tags.push("small-edit".to_string());
    }

    let lower = edit.content.to_lowercase();
    for (tag, markers) in KEYWORD_TAGS {
        if markers.iter().any(|m| lower.contains(m)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// An edit is significant when it is big enough to plausibly implement a
/// decision. Deletions have their own, higher floor: short deletes are
/// never significant.
pub fn is_significant(edit: &EditRecord) -> bool {
    let len = edit.content.chars().count();
    match edit.edit_type {
        EditKind::Delete => len >= 100,
        EditKind::Modify | EditKind::Insert => len >= 50,
    }
}

/// Auto-link every significant edit to the most recent decision made within
/// the link window before it
pub fn link_decisions(edits: &[EditRecord], decisions: &[DesignDecision]) -> Vec<DecisionLink> {
    let window = Duration::seconds(LINK_WINDOW_SECS);
    edits
        .iter()
        .filter(|e| is_significant(e))
        .filter_map(|edit| {
            decisions
                .iter()
                .filter(|d| {
                    d.timestamp <= edit.timestamp && edit.timestamp - d.timestamp <= window
                })
                .max_by_key(|d| d.timestamp)
                .map(|decision| DecisionLink {
                    edit_id: edit.id.clone(),
                    decision_id: decision.id.clone(),
                    strength: LINK_STRENGTH,
                })
        })
        .collect()
}
