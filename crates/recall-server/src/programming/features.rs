// crates/recall-server/src/programming/features.rs
// Lightweight per-language feature extraction from source text

const MAX_IMPORTS: usize = 5;
const MAX_FUNCTIONS: usize = 10;
const MAX_VARIABLES: usize = 5;
const MAX_SAMPLED_LINES: usize = 50;
const MAX_COMMENTS: usize = 5;

/// Structural features pulled out of one source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFeatures {
    pub imports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub interfaces: Vec<String>,
    pub variables: Vec<String>,
    pub comments: Vec<String>,
    /// Only populated by the generic extractor for unknown languages
    pub sampled_lines: Vec<String>,
}

/// Extract features with line-prefix heuristics per language; unknown
/// languages fall back to sampling.
pub fn extract_features(language: &str, content: &str) -> FileFeatures {
    match language.to_lowercase().as_str() {
        "go" => extract_with(content, &GO),
        "rust" | "rs" => extract_with(content, &RUST),
        "python" | "py" => extract_with(content, &PYTHON),
        "javascript" | "js" | "typescript" | "ts" => extract_with(content, &JS_TS),
        "java" => extract_with(content, &JAVA),
        _ => extract_generic(content),
    }
}

/// Prefix tables per language family
struct LanguageRules {
    imports: &'static [&'static str],
    functions: &'static [&'static str],
    classes: &'static [&'static str],
    interfaces: &'static [&'static str],
    variables: &'static [&'static str],
    comment: &'static str,
}

static GO: LanguageRules = LanguageRules {
    imports: &["import "],
    functions: &["func "],
    classes: &["type "],
    interfaces: &[],
    variables: &["var ", "const "],
    comment: "//",
};

static RUST: LanguageRules = LanguageRules {
    imports: &["use "],
    functions: &["fn ", "pub fn ", "pub(crate) fn ", "async fn ", "pub async fn "],
    classes: &["struct ", "pub struct ", "enum ", "pub enum "],
    interfaces: &["trait ", "pub trait "],
    variables: &["static ", "const ", "pub const "],
    comment: "//",
};

static PYTHON: LanguageRules = LanguageRules {
    imports: &["import ", "from "],
    functions: &["def ", "async def "],
    classes: &["class "],
    interfaces: &[],
    variables: &[],
    comment: "#",
};

static JS_TS: LanguageRules = LanguageRules {
    imports: &["import "],
    functions: &["function ", "async function ", "export function ", "export async function "],
    classes: &["class ", "export class "],
    interfaces: &["interface ", "export interface "],
    variables: &["let ", "var ", "const "],
    comment: "//",
};

static JAVA: LanguageRules = LanguageRules {
    imports: &["import "],
    functions: &["public ", "private ", "protected "],
    classes: &["class ", "public class ", "abstract class "],
    interfaces: &["interface ", "public interface "],
    variables: &[],
    comment: "//",
};

fn extract_with(content: &str, rules: &LanguageRules) -> FileFeatures {
    let mut features = FileFeatures::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(rules.comment) {
            if features.comments.len() < MAX_COMMENTS {
                features.comments.push(line.to_string());
            }
            continue;
        }

        if matches_prefix(line, rules.interfaces) {
            features.interfaces.push(line.to_string());
        } else if matches_prefix(line, rules.classes) {
            features.classes.push(line.to_string());
        } else if matches_prefix(line, rules.functions) {
            if features.functions.len() < MAX_FUNCTIONS {
                features.functions.push(line.to_string());
            }
        } else if matches_prefix(line, rules.imports) {
            if features.imports.len() < MAX_IMPORTS {
                features.imports.push(line.to_string());
            }
        } else if matches_prefix(line, rules.variables)
            && features.variables.len() < MAX_VARIABLES
        {
            features.variables.push(line.to_string());
        }
    }
    features
}

fn matches_prefix(line: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| line.starts_with(p))
}

/// Unknown language: sample every ceil(n/10)-th non-comment line, capped,
/// plus the first few comment lines
fn extract_generic(content: &str) -> FileFeatures {
    let mut features = FileFeatures::default();
    let non_comment: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| {
            let is_comment =
                l.starts_with("//") || l.starts_with('#') || l.starts_with("/*") || l.starts_with("--");
            if is_comment && features.comments.len() < MAX_COMMENTS {
                features.comments.push(l.to_string());
            }
            !is_comment
        })
        .collect();

    if non_comment.is_empty() {
        return features;
    }
    let step = non_comment.len().div_ceil(10).max(1);
    features.sampled_lines = non_comment
        .iter()
        .step_by(step)
        .take(MAX_SAMPLED_LINES)
        .map(|l| l.to_string())
        .collect();
    features
}
