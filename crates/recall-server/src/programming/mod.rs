// crates/recall-server/src/programming/mod.rs
// Programming-context extraction: the editor-side side-car view (files,
// edits, decisions, snippets, statistics) used for relevant knowledge.

mod edits;
mod features;
mod format;

pub use edits::{edit_tags, is_significant, link_decisions};
pub use features::{FileFeatures, extract_features};
pub use format::render;

use recall_types::{
    DecisionLink, DesignDecision, EditRecord, FileAssociation, SessionSnapshot, VectorMatch,
};
use std::collections::BTreeMap;

/// Edits kept in the recent window
const RECENT_EDITS: usize = 10;
/// Decisions surfaced, newest first
const RECENT_DECISIONS: usize = 5;
/// Snippet hits must carry this content type
const SNIPPET_CONTENT_TYPE: &str = "code_features";

/// Aggregate statistics over a session snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgrammingStats {
    pub total_files: usize,
    pub total_edits: usize,
    pub language_usage: BTreeMap<String, usize>,
    pub edits_by_file: BTreeMap<String, usize>,
    pub activity_by_day: BTreeMap<String, usize>,
    pub decisions_by_category: BTreeMap<String, usize>,
}

/// The structured side-car view of one session
#[derive(Debug, Clone, Default)]
pub struct ProgrammingContext {
    pub files: Vec<FileAssociation>,
    /// Last ten edits, oldest first
    pub recent_edits: Vec<EditRecord>,
    /// Up to five latest decisions, newest first
    pub decisions: Vec<DesignDecision>,
    /// Relevant code snippets, score ordered
    pub snippets: Vec<VectorMatch>,
    pub links: Vec<DecisionLink>,
    pub stats: ProgrammingStats,
}

/// Pure, stateless extractor: everything derives from the snapshot and the
/// snippet hits the caller already retrieved.
pub struct ProgrammingContextExtractor;

impl ProgrammingContextExtractor {
    pub fn extract(snapshot: &SessionSnapshot, snippet_hits: &[VectorMatch]) -> ProgrammingContext {
        let mut edits = snapshot.edits.clone();
        edits.sort_by_key(|e| e.timestamp);
        let window_start = edits.len().saturating_sub(RECENT_EDITS);
        let recent_edits = edits[window_start..].to_vec();

        let mut decisions = snapshot.decisions.clone();
        decisions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        decisions.truncate(RECENT_DECISIONS);

        let mut snippets: Vec<VectorMatch> = snippet_hits
            .iter()
            .filter(|hit| hit.content_type == SNIPPET_CONTENT_TYPE)
            .cloned()
            .collect();
        snippets.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ProgrammingContext {
            files: snapshot.files.clone(),
            links: link_decisions(&snapshot.edits, &snapshot.decisions),
            stats: compute_stats(snapshot),
            recent_edits,
            decisions,
            snippets,
        }
    }
}

fn compute_stats(snapshot: &SessionSnapshot) -> ProgrammingStats {
    let mut stats = ProgrammingStats {
        total_files: snapshot.files.len(),
        total_edits: snapshot.edits.len(),
        ..ProgrammingStats::default()
    };

    for file in &snapshot.files {
        if !file.language.is_empty() {
            *stats.language_usage.entry(file.language.clone()).or_default() += 1;
        }
    }
    for edit in &snapshot.edits {
        *stats.edits_by_file.entry(edit.file_path.clone()).or_default() += 1;
        let day = edit.timestamp.format("%Y-%m-%d").to_string();
        *stats.activity_by_day.entry(day).or_default() += 1;
    }
    for decision in &snapshot.decisions {
        let category = if decision.category.is_empty() {
            "uncategorized".to_string()
        } else {
            decision.category.clone()
        };
        *stats.decisions_by_category.entry(category).or_default() += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use recall_types::EditKind;
    use std::collections::HashMap;

    fn snapshot() -> SessionSnapshot {
        let base = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        SessionSnapshot {
            session_id: "s-1".into(),
            user_id: "u-1".into(),
            files: vec![
                FileAssociation {
                    path: "src/cache.go".into(),
                    language: "go".into(),
                    content: "package cache".into(),
                    associated_at: base,
                },
                FileAssociation {
                    path: "src/index.go".into(),
                    language: "go".into(),
                    content: "package index".into(),
                    associated_at: base,
                },
            ],
            edits: (0..13)
                .map(|i| EditRecord {
                    id: format!("e-{}", i),
                    file_path: "src/cache.go".into(),
                    edit_type: EditKind::Modify,
                    content: "x".repeat(60),
                    timestamp: base + chrono::Duration::minutes(i),
                })
                .collect(),
            decisions: (0..7)
                .map(|i| DesignDecision {
                    id: format!("d-{}", i),
                    title: format!("decision {}", i),
                    description: String::new(),
                    category: "architecture".into(),
                    timestamp: base + chrono::Duration::minutes(i),
                })
                .collect(),
        }
    }

    fn snippet(id: &str, content_type: &str, similarity: f64) -> VectorMatch {
        VectorMatch {
            doc_id: id.into(),
            content: "fn lookup()".into(),
            content_type: content_type.into(),
            source: "vector".into(),
            similarity,
            relevance_score: similarity,
            matched_segments: vec![],
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_recent_edits_window_is_ten_oldest_first() {
        let ctx = ProgrammingContextExtractor::extract(&snapshot(), &[]);
        assert_eq!(ctx.recent_edits.len(), 10);
        // 13 edits total: window starts at e-3
        assert_eq!(ctx.recent_edits[0].id, "e-3");
        assert_eq!(ctx.recent_edits[9].id, "e-12");
        assert!(ctx.recent_edits[0].timestamp < ctx.recent_edits[9].timestamp);
    }

    #[test]
    fn test_decisions_capped_newest_first() {
        let ctx = ProgrammingContextExtractor::extract(&snapshot(), &[]);
        assert_eq!(ctx.decisions.len(), 5);
        assert_eq!(ctx.decisions[0].id, "d-6");
        assert!(ctx.decisions[0].timestamp > ctx.decisions[4].timestamp);
    }

    #[test]
    fn test_snippets_filtered_by_content_type_and_ordered() {
        let hits = vec![
            snippet("doc", "document", 0.99),
            snippet("weak", "code_features", 0.5),
            snippet("strong", "code_features", 0.9),
        ];
        let ctx = ProgrammingContextExtractor::extract(&snapshot(), &hits);
        let ids: Vec<_> = ctx.snippets.iter().map(|s| s.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["strong", "weak"]);
    }

    #[test]
    fn test_stats() {
        let ctx = ProgrammingContextExtractor::extract(&snapshot(), &[]);
        assert_eq!(ctx.stats.total_files, 2);
        assert_eq!(ctx.stats.total_edits, 13);
        assert_eq!(ctx.stats.language_usage["go"], 2);
        assert_eq!(ctx.stats.edits_by_file["src/cache.go"], 13);
        assert_eq!(ctx.stats.activity_by_day["2025-01-05"], 13);
        assert_eq!(ctx.stats.decisions_by_category["architecture"], 7);
    }

    #[test]
    fn test_links_computed_over_full_snapshot() {
        let ctx = ProgrammingContextExtractor::extract(&snapshot(), &[]);
        // Every significant edit has a decision within 300s
        assert!(!ctx.links.is_empty());
        assert!(ctx.links.iter().all(|l| l.strength == 0.8));
    }

    #[test]
    fn test_empty_snapshot() {
        let ctx = ProgrammingContextExtractor::extract(&SessionSnapshot::default(), &[]);
        assert!(ctx.recent_edits.is_empty());
        assert!(ctx.decisions.is_empty());
        assert_eq!(ctx.stats.total_files, 0);
    }
}
