//! crates/recall-server/src/utils/json.rs
//! Hardened JSON extraction for model output.
//!
//! The `format = "json"` request flag is a contract, not a guarantee: models
//! still wrap payloads in markdown fences or chat around them. Parsing is
//! therefore staged: direct parse, then fence removal, then balanced-block
//! extraction.

use serde::de::DeserializeOwned;

/// Parse a typed value out of raw LLM output.
pub fn parse_llm_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let trimmed = raw.trim();

    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return Ok(v);
    }

    let unfenced = strip_fences(trimmed);
    if unfenced != trimmed
        && let Ok(v) = serde_json::from_str::<T>(unfenced)
    {
        return Ok(v);
    }

    if let Some(block) = first_json_block(unfenced)
        && let Ok(v) = serde_json::from_str::<T>(block)
    {
        return Ok(v);
    }

    Err(format!(
        "unparseable LLM JSON (direct, unfenced, and block extraction all failed); output began: {:?}",
        truncate_head(trimmed, 160)
    ))
}

/// Remove a single surrounding markdown code fence, with or without a
/// language tag (```json, ```JSON, bare ```).
fn strip_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return s;
    };
    // Drop the language tag on the opening fence line, if any
    match body.split_once('\n') {
        Some((tag, remainder)) if !tag.contains('{') && !tag.contains('[') => remainder.trim(),
        _ => body.trim(),
    }
}

/// Locate the first balanced `{...}` or `[...]` span, honoring string
/// literals and escapes.
fn first_json_block(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let open = s.as_bytes()[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in s.as_bytes()[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate_head(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
