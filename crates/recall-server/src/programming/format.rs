// crates/recall-server/src/programming/format.rs
// Fixed human-readable rendering of the programming context

use super::ProgrammingContext;
use crate::utils::truncate_chars;
use std::fmt::Write;

const EMPTY_SECTION: &str = "暂无";

/// Render the side-car view into the block format the upstream assistant
/// expects. Section markers are part of the contract; do not localize.
pub fn render(context: &ProgrammingContext, related_context: Option<&str>) -> String {
    let mut out = String::from("【编程上下文】\n");

    let _ = writeln!(out, "【会话特性】");
    if context.stats.total_files == 0 && context.stats.total_edits == 0 {
        let _ = writeln!(out, "{}", EMPTY_SECTION);
    } else {
        let languages: Vec<&str> = context
            .stats
            .language_usage
            .keys()
            .map(String::as_str)
            .collect();
        let _ = writeln!(
            out,
            "文件 {} 个，编辑 {} 次，语言: {}",
            context.stats.total_files,
            context.stats.total_edits,
            if languages.is_empty() {
                "-".to_string()
            } else {
                languages.join(", ")
            }
        );
    }

    let _ = writeln!(out, "【设计决策】");
    if context.decisions.is_empty() {
        let _ = writeln!(out, "{}", EMPTY_SECTION);
    } else {
        for decision in &context.decisions {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                if decision.category.is_empty() {
                    "general"
                } else {
                    &decision.category
                },
                decision.title,
                truncate_chars(&decision.description, 80)
            );
        }
    }

    let _ = writeln!(out, "【关联文件】");
    if context.files.is_empty() {
        let _ = writeln!(out, "{}", EMPTY_SECTION);
    } else {
        for file in &context.files {
            let _ = writeln!(out, "- {} ({})", file.path, file.language);
        }
    }

    let _ = writeln!(out, "【最近编辑】");
    if context.recent_edits.is_empty() {
        let _ = writeln!(out, "{}", EMPTY_SECTION);
    } else {
        for edit in &context.recent_edits {
            let _ = writeln!(
                out,
                "- [{}] {} @ {}: {}",
                edit.edit_type.label(),
                edit.file_path,
                edit.timestamp.format("%m-%d %H:%M"),
                truncate_chars(&edit.content, 60)
            );
        }
    }

    let _ = writeln!(out, "【相关代码片段】");
    if context.snippets.is_empty() {
        let _ = writeln!(out, "{}", EMPTY_SECTION);
    } else {
        for snippet in &context.snippets {
            let _ = writeln!(
                out,
                "- {} ({:.2}): {}",
                snippet.doc_id,
                snippet.similarity,
                truncate_chars(&snippet.content, 120)
            );
        }
    }

    let _ = writeln!(out, "【相关上下文】");
    match related_context {
        Some(text) if !text.trim().is_empty() => {
            let _ = writeln!(out, "{}", text.trim());
        }
        _ => {
            let _ = writeln!(out, "{}", EMPTY_SECTION);
        }
    }

    let _ = writeln!(out, "【编程统计】");
    let _ = writeln!(
        out,
        "total_files: {}, total_edits: {}",
        context.stats.total_files, context.stats.total_edits
    );
    if !context.stats.edits_by_file.is_empty() {
        for (file, count) in &context.stats.edits_by_file {
            let _ = writeln!(out, "- {}: {} 次编辑", file, count);
        }
    }
    if !context.stats.activity_by_day.is_empty() {
        for (day, count) in &context.stats.activity_by_day {
            let _ = writeln!(out, "- {}: {} 次活动", day, count);
        }
    }
    if !context.stats.decisions_by_category.is_empty() {
        for (category, count) in &context.stats.decisions_by_category {
            let _ = writeln!(out, "- {}: {} 个决策", category, count);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::super::{ProgrammingContextExtractor, ProgrammingContext};
    use super::*;
    use chrono::{TimeZone, Utc};
    use recall_types::{EditKind, EditRecord, FileAssociation, SessionSnapshot};

    #[test]
    fn test_empty_context_renders_all_markers() {
        let rendered = render(&ProgrammingContext::default(), None);
        for marker in [
            "【编程上下文】",
            "【会话特性】",
            "【设计决策】",
            "【关联文件】",
            "【最近编辑】",
            "【相关代码片段】",
            "【相关上下文】",
            "【编程统计】",
        ] {
            assert!(rendered.contains(marker), "missing {}", marker);
        }
        assert!(rendered.contains(EMPTY_SECTION));
    }

    #[test]
    fn test_populated_context_renders_entries() {
        let base = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        let snapshot = SessionSnapshot {
            session_id: "s".into(),
            user_id: "u".into(),
            files: vec![FileAssociation {
                path: "src/cache.go".into(),
                language: "go".into(),
                content: String::new(),
                associated_at: base,
            }],
            edits: vec![EditRecord {
                id: "e-1".into(),
                file_path: "src/cache.go".into(),
                edit_type: EditKind::Modify,
                content: "tightened eviction".into(),
                timestamp: base,
            }],
            decisions: vec![],
        };
        let ctx = ProgrammingContextExtractor::extract(&snapshot, &[]);
        let rendered = render(&ctx, Some("session is about cache tuning"));

        assert!(rendered.contains("- src/cache.go (go)"));
        assert!(rendered.contains("[modify] src/cache.go"));
        assert!(rendered.contains("session is about cache tuning"));
        assert!(rendered.contains("total_files: 1, total_edits: 1"));
    }
}
