//! JSON extraction for model output.
//!
//! Models wrap JSON in markdown fences, prepend prose, or leave trailing
//! commas. `extract_json` tolerates those and nothing more; anything else is
//! reported as an `LlmApi` error with a short preview.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{DocError, Result};

/// Parse a JSON value out of a model response
pub fn extract_json(content: &str) -> Result<Value> {
    let cleaned = preprocess(content);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    debug!("Initial JSON parse failed, attempting repair");

    let repaired = fix_trailing_commas(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("JSON repaired (trailing commas)");
        return Ok(value);
    }

    if let Some(extracted) = extract_from_mixed(&cleaned) {
        let extracted = fix_trailing_commas(extracted);
        if let Ok(value) = serde_json::from_str::<Value>(&extracted) {
            warn!("JSON extracted from mixed content");
            return Ok(value);
        }
    }

    Err(DocError::LlmApi(format!(
        "Failed to parse JSON from model output. Content preview: {}...",
        cleaned.chars().take(200).collect::<String>()
    )))
}

fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}');
    strip_code_fences(s).trim().to_string()
}

fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }

    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }

    result
}

fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
        } else if in_string {
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        result.push(ch);
    }

    result
}

/// Slice of the first balanced top-level object or array
fn extract_from_mixed(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let (open, close) = if s[start..].starts_with('{') {
        ('{', '}')
    } else {
        ('[', ']')
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (offset, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
