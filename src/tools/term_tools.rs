//! Term-normalization tools (§4.3, §4.4): `normalize_term`, `fuzzy_search`.

use crate::normalize;
use crate::types::{ParamKind, ParamSpec, ToolData, ToolParams, ToolResult};

use super::{cap_rows, Tool, ToolSpec, ToolState};

/// Expand a term through the synonym map.
pub struct NormalizeTermTool;

impl Tool for NormalizeTermTool {
    fn name(&self) -> &'static str {
        "normalize_term"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Expand a term into its known surface-form variants",
            params: vec![ParamSpec::new("term", ParamKind::String, true, "\"registration\"", "term to expand")],
            example: "{\"term\": \"registration\"}",
        }
    }

    fn execute(&self, params: &ToolParams, _state: &ToolState<'_>) -> ToolResult {
        let Some(term) = params.string("term") else {
            return ToolResult::failure("normalize_term requires a non-empty term");
        };
        let variants = normalize::normalize(term);
        ToolResult::ok(format!("{} variants for {term:?}", variants.len()), ToolData::StringList(variants))
    }
}

/// Union of substring search over every variant of a term (§4.3).
pub struct FuzzySearchTool;

impl Tool for FuzzySearchTool {
    fn name(&self) -> &'static str {
        "fuzzy_search"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Search rows for any known variant of a term",
            params: vec![
                ParamSpec::new("term", ParamKind::String, true, "\"registration\"", "term to search for, expanded through synonyms"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to search (auto-injected)"),
            ],
            example: "{\"term\": \"registration\"}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(term) = params.string("term") else {
            return ToolResult::failure("fuzzy_search requires a non-empty term");
        };
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("fuzzy_search has no row set to search");
        };

        match normalize::fuzzy_search(state.store, rows, term) {
            Ok(hits) => {
                let total_rows = rows.len();
                let kept = hits.len();
                let (hits, truncated) = cap_rows(hits, state.max_rows_in_result);
                let mut message = format!("kept {kept} of {total_rows} rows matching any variant of {term:?}");
                if truncated {
                    message.push_str(&format!(" (capped at {})", state.max_rows_in_result));
                }
                ToolResult::ok(message, ToolData::Rows(hits))
            }
            Err(err) => ToolResult::failure(err.to_string()),
        }
    }
}
