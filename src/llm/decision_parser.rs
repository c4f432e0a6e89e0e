//! JSON Decision Parser (§4.7): robust extraction of a [`Decision`] from
//! arbitrary LLM text.
//!
//! Directly grounded in the teacher's `ResponseParser`
//! (`src/response_parser.rs`): tier 1 (direct parse) and tier 3
//! (brace-balanced, string/escape-aware scan) are carried over in spirit.
//! Tier 2 (fenced-block *extraction*, not just stripping) and tier 4
//! (trailing-comma cleanup) are added because the distilled spec calls for
//! them specifically.

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::logging::{log_debug, log_warn};
use crate::types::Decision;

/// Parse `raw` into a [`Decision`], trying four strategies in order.
pub fn parse_decision(raw: &str) -> EngineResult<Decision> {
    log_debug!(
        content_length = raw.len(),
        content_preview = %raw.chars().take(200).collect::<String>(),
        "parsing LLM output as a Decision"
    );

    if let Some(value) = try_direct(raw) {
        return to_decision(value, raw);
    }

    if let Some(value) = try_fenced_block(raw) {
        return to_decision(value, raw);
    }

    if let Some(json_str) = extract_balanced_json(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(&json_str) {
            return to_decision(value, raw);
        }

        let cleaned = strip_trailing_commas(&json_str);
        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            return to_decision(value, raw);
        }
    }

    let preview: String = raw.chars().take(200).collect();
    log_warn!(content_preview = %preview, "all parse tiers failed");
    Err(EngineError::llm_parse_failed(
        "no valid JSON object could be extracted from the reasoner's reply",
        raw,
    ))
}

fn try_direct(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw.trim())
        .ok()
        .filter(Value::is_object)
}

/// Extract the content of the first fenced code block (optionally tagged
/// `json`) and parse it. Unlike the teacher's `clean_artifacts`, which only
/// strips fence markers wherever they occur, this extracts the fenced
/// *content* specifically — text outside the fence is discarded.
fn try_fenced_block(raw: &str) -> Option<Value> {
    let start = raw.find("```")?;
    let after_open = &raw[start + 3..];
    let after_tag = after_open
        .strip_prefix("json")
        .or_else(|| after_open.strip_prefix("JSON"))
        .unwrap_or(after_open);
    let after_tag = after_tag.strip_prefix('\n').unwrap_or(after_tag);
    let end = after_tag.find("```")?;
    let fenced = after_tag[..end].trim();

    serde_json::from_str::<Value>(fenced)
        .ok()
        .filter(Value::is_object)
        .or_else(|| {
            let cleaned = strip_trailing_commas(fenced);
            serde_json::from_str::<Value>(&cleaned)
                .ok()
                .filter(Value::is_object)
        })
}

/// Take the longest substring from the first `{` to its matching balanced
/// `}`, tracking string/escape state so braces inside string literals don't
/// confuse the count.
fn extract_balanced_json(raw: &str) -> Option<String> {
    let start_idx = raw.find('{')?;
    let chars: Vec<char> = raw[start_idx..].chars().collect();

    let mut brace_count = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (idx, ch) in chars.iter().enumerate() {
        match ch {
            '"' if !escaped => in_string = !in_string,
            '\\' if in_string => escaped = !escaped,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => {
                brace_count -= 1;
                if brace_count == 0 {
                    end = Some(idx);
                    break;
                }
            }
            _ => {}
        }
        if *ch != '\\' {
            escaped = false;
        }
    }

    end.map(|e| chars[..=e].iter().collect())
}

/// Strip a trailing comma immediately before a closing `}` or `]`, ignoring
/// commas inside string literals.
fn strip_trailing_commas(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = input.chars().collect();

    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        match ch {
            '"' if !escaped => in_string = !in_string,
            '\\' if in_string => escaped = !escaped,
            _ => {}
        }
        if ch != '\\' {
            escaped = false;
        }

        if ch == ',' && !in_string {
            let mut lookahead = idx + 1;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }
            if lookahead < chars.len() && (chars[lookahead] == '}' || chars[lookahead] == ']') {
                idx += 1;
                continue;
            }
        }

        output.push(ch);
        idx += 1;
    }

    output
}

fn to_decision(value: Value, raw: &str) -> EngineResult<Decision> {
    if !value.is_object() || value.as_object().is_some_and(serde_json::Map::is_empty) {
        return Err(EngineError::llm_parse_failed(
            "reasoner output was not a non-empty JSON object",
            raw,
        ));
    }

    serde_json::from_value::<Decision>(value)
        .map_err(|err| EngineError::llm_parse_failed(format!("Decision shape invalid: {err}"), raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direct_json() {
        let decision = parse_decision(r#"{"done":false,"tool":"get_log_count","parameters":{}}"#).unwrap();
        assert!(!decision.done);
        assert_eq!(decision.tool.as_deref(), Some("get_log_count"));
    }

    #[test]
    fn extracts_from_fenced_code_block() {
        let raw = "Here is my decision:\n```json\n{\"done\":true,\"answer\":\"2115\"}\n```\nthanks";
        let decision = parse_decision(raw).unwrap();
        assert!(decision.done);
        assert_eq!(decision.answer.as_deref(), Some("2115"));
    }

    #[test]
    fn extracts_balanced_json_from_surrounding_prose() {
        let raw = "Sure! {\"done\":false,\"tool\":\"search_logs\",\"parameters\":{\"value\":\"x\"}} is my call.";
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.tool.as_deref(), Some("search_logs"));
    }

    #[test]
    fn strips_trailing_commas() {
        let raw = r#"{"done":false,"tool":"get_log_count","parameters":{},}"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(decision.tool.as_deref(), Some("get_log_count"));
    }

    #[test]
    fn defaults_absent_optional_fields() {
        let decision = parse_decision(r#"{"done":true,"answer":"ok"}"#).unwrap();
        assert_eq!(decision.reasoning, "");
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.parameters, Value::Null);
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(parse_decision("[1,2,3]").is_err());
    }

    #[test]
    fn rejects_empty_object() {
        assert!(parse_decision("{}").is_err());
    }

    #[test]
    fn rejects_unparseable_garbage() {
        assert!(parse_decision("not json at all, sorry").is_err());
    }
}
