//! Row-producing and row-consuming tools (§4.4): `search_logs`,
//! `filter_by_time`, `filter_by_severity`, `filter_by_field`,
//! `get_log_count`, `return_logs`.

use std::str::FromStr;

use crate::store::Severity;
use crate::types::{ParamKind, ParamSpec, ToolData, ToolParams, ToolResult};

use super::{cap_rows, Tool, ToolSpec, ToolState};

/// Append a capped-at note to a row-producing tool's message when
/// `max_rows_in_result` truncated the result (§5 Resource bounds).
fn with_cap_note(message: String, truncated: bool, max_rows_in_result: usize) -> String {
    if truncated {
        format!("{message} (capped at {max_rows_in_result})")
    } else {
        message
    }
}

/// Substring search over `loaded_rows` — unlike every other row-consuming
/// tool here, this one always starts from the full dataset rather than the
/// narrowing `filtered_rows` chain (§4.4 table), since a search is typically
/// how a query begins.
pub struct SearchLogsTool;

impl Tool for SearchLogsTool {
    fn name(&self) -> &'static str {
        "search_logs"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Substring search over the full log dataset",
            params: vec![
                ParamSpec::new("value", ParamKind::String, true, "\"MAWED07T01\"", "literal substring to search for"),
                ParamSpec::new(
                    "columns",
                    ParamKind::List,
                    false,
                    "[\"_source.log\"]",
                    "columns to search; all columns if omitted",
                ),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to search (auto-injected: loaded_rows)"),
            ],
            example: "{\"value\": \"MAWED07T01\"}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(value) = params.string("value") else {
            return ToolResult::failure("search_logs requires a non-empty value");
        };
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("search_logs has no row set to search");
        };
        let columns: Vec<String> = params.list("columns").map(<[String]>::to_vec).unwrap_or_default();

        match state.store.search_substring(rows, value, &columns) {
            Ok(hits) => {
                let total_rows = rows.len();
                let kept = hits.len();
                let (hits, truncated) = cap_rows(hits, state.max_rows_in_result);
                let message = with_cap_note(
                    format!("kept {kept} of {total_rows} rows matching {value:?}"),
                    truncated,
                    state.max_rows_in_result,
                );
                ToolResult::ok(message, ToolData::Rows(hits))
            }
            Err(err) => ToolResult::failure(err.to_string()),
        }
    }
}

/// Time-range filter over injected rows (`filtered_rows` else `loaded_rows`).
pub struct FilterByTimeTool;

impl Tool for FilterByTimeTool {
    fn name(&self) -> &'static str {
        "filter_by_time"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Keep rows within an ISO-8601 timestamp range",
            params: vec![
                ParamSpec::new("start", ParamKind::String, false, "\"2026-01-01T00:00:00Z\"", "inclusive lower bound"),
                ParamSpec::new("end", ParamKind::String, false, "\"2026-01-01T01:00:00Z\"", "inclusive upper bound"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to filter (auto-injected)"),
            ],
            example: "{\"start\": \"2026-01-01T00:00:00Z\"}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("filter_by_time has no row set to filter");
        };
        let start = params.string("start");
        let end = params.string("end");

        match state.store.filter_time(rows, start, end) {
            Ok(kept) => {
                let total_rows = rows.len();
                let kept_count = kept.len();
                let (kept, truncated) = cap_rows(kept, state.max_rows_in_result);
                let message = with_cap_note(
                    format!("kept {kept_count} of {total_rows} rows within the time bound"),
                    truncated,
                    state.max_rows_in_result,
                );
                ToolResult::ok(message, ToolData::Rows(kept))
            }
            Err(err) => ToolResult::failure(err.to_string()),
        }
    }
}

/// Severity-set filter over injected rows.
pub struct FilterBySeverityTool;

impl Tool for FilterBySeverityTool {
    fn name(&self) -> &'static str {
        "filter_by_severity"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Keep rows whose severity is in the given set",
            params: vec![
                ParamSpec::new("severities", ParamKind::List, true, "[\"ERROR\", \"CRITICAL\"]", "severity levels to keep"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to filter (auto-injected)"),
            ],
            example: "{\"severities\": [\"ERROR\"]}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("filter_by_severity has no row set to filter");
        };
        let Some(raw_levels) = params.list("severities") else {
            return ToolResult::failure("filter_by_severity requires a non-empty severities list");
        };
        if raw_levels.is_empty() {
            return ToolResult::failure("filter_by_severity requires a non-empty severities list");
        }

        let mut severities = Vec::with_capacity(raw_levels.len());
        for level in raw_levels {
            match Severity::from_str(level) {
                Ok(sev) => severities.push(sev),
                Err(()) => return ToolResult::failure(format!("unknown severity level: {level:?}")),
            }
        }

        match state.store.filter_severity(rows, &severities) {
            Ok(kept) => {
                let total_rows = rows.len();
                let kept_count = kept.len();
                let (kept, truncated) = cap_rows(kept, state.max_rows_in_result);
                let message = with_cap_note(
                    format!("kept {kept_count} of {total_rows} rows matching severities {raw_levels:?}"),
                    truncated,
                    state.max_rows_in_result,
                );
                ToolResult::ok(message, ToolData::Rows(kept))
            }
            Err(err) => ToolResult::failure(err.to_string()),
        }
    }
}

/// Exact field-equality filter over injected rows. Missing field on all rows
/// yields an empty result, not an error (§4.4 table).
pub struct FilterByFieldTool;

impl Tool for FilterByFieldTool {
    fn name(&self) -> &'static str {
        "filter_by_field"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Keep rows whose named field exactly equals a value",
            params: vec![
                ParamSpec::new("field", ParamKind::String, true, "\"pod_ip\"", "column name to match"),
                ParamSpec::new("value", ParamKind::String, true, "\"172.17.13.5\"", "value to match exactly"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to filter (auto-injected)"),
            ],
            example: "{\"field\": \"pod_ip\", \"value\": \"172.17.13.5\"}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("filter_by_field has no row set to filter");
        };
        let Some(field) = params.string("field") else {
            return ToolResult::failure("filter_by_field requires a field name");
        };
        let Some(value) = params.string("value") else {
            return ToolResult::failure("filter_by_field requires a value");
        };

        let kept = state.store.filter_field(rows, field, value);
        match kept {
            Ok(kept) => {
                let total_rows = rows.len();
                let kept_count = kept.len();
                let (kept, truncated) = cap_rows(kept, state.max_rows_in_result);
                let message = with_cap_note(
                    format!("kept {kept_count} of {total_rows} rows where {field}={value:?}"),
                    truncated,
                    state.max_rows_in_result,
                );
                ToolResult::ok(message, ToolData::Rows(kept))
            }
            Err(err) => ToolResult::failure(err.to_string()),
        }
    }
}

/// Row count over injected rows.
pub struct GetLogCountTool;

impl Tool for GetLogCountTool {
    fn name(&self) -> &'static str {
        "get_log_count"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Count the rows in the current row set",
            params: vec![ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to count (auto-injected)")],
            example: "{}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("get_log_count has no row set to count");
        };
        let count = state.store.count(rows);
        ToolResult::ok(format!("counted {count} rows"), ToolData::Count(count))
    }
}

/// Human-readable summary block: total count, time span, severity
/// histogram, and up to `max_samples` example rows capped at 200 chars each.
pub struct ReturnLogsTool;

impl Tool for ReturnLogsTool {
    fn name(&self) -> &'static str {
        "return_logs"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Render a human-readable summary of the current row set",
            params: vec![
                ParamSpec::new("max_samples", ParamKind::Integer, false, "10", "maximum example rows to render"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to render (auto-injected)"),
            ],
            example: "{\"max_samples\": 5}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("return_logs has no row set to render");
        };

        let max_samples = params
            .integer("max_samples")
            .map(|n| n.max(0) as usize)
            .unwrap_or(state.max_samples_in_return_logs)
            .min(state.max_samples_in_return_logs);

        let total = rows.len();
        let mut min_ts: Option<&str> = None;
        let mut max_ts: Option<&str> = None;
        let mut severity_counts: std::collections::BTreeMap<&'static str, usize> = std::collections::BTreeMap::new();
        let mut samples = Vec::new();

        for index in rows.iter() {
            let Some(row) = state.store.row(index) else { continue };

            if let Some(ts) = row.timestamp.as_deref() {
                if min_ts.is_none_or(|m| ts < m) {
                    min_ts = Some(ts);
                }
                if max_ts.is_none_or(|m| ts > m) {
                    max_ts = Some(ts);
                }
            }

            if let Some(sev) = row.severity {
                *severity_counts.entry(sev.as_str()).or_insert(0) += 1;
            }

            if samples.len() < max_samples {
                samples.push(row.preview(200));
            }
        }

        let span = match (min_ts, max_ts) {
            (Some(start), Some(end)) => format!("{start} .. {end}"),
            _ => "n/a".to_string(),
        };

        let histogram = severity_counts
            .iter()
            .map(|(level, count)| format!("{level}={count}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut text = format!(
            "Total: {total} rows\nTime span: {span}\nSeverity: {}\nSamples:\n",
            if histogram.is_empty() { "n/a".to_string() } else { histogram }
        );
        for (i, sample) in samples.iter().enumerate() {
            text.push_str(&format!("{}. {sample}\n", i + 1));
        }

        ToolResult::ok(format!("Formatted {total} logs"), ToolData::Text(text))
    }
}

// `Option::is_none_or` is only stable since Rust 1.82; this crate targets
// 1.75, so a small local helper keeps `ReturnLogsTool` portable.
trait IsNoneOr<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool;
}

impl<T: Copy> IsNoneOr<T> for Option<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool {
        match self {
            Some(v) => f(v),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityCatalog;
    use crate::store::{CsvLogStore, Row, RowSet};
    use crate::types::ParamValue;
    use std::collections::HashMap;

    const CATALOG_TOML: &str = r#"
[patterns]
cm_mac = ["(?i)\\b([0-9a-f]{2}(?::[0-9a-f]{2}){5})\\b"]

[aliases]
cm_mac = ["cable modem"]

[relationships]
cm_mac = []
"#;

    fn row(fields: &[(&str, &str)]) -> Row {
        let map: HashMap<String, String> = fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Row::from_fields(map)
    }

    fn sample_state<'a>(store: &'a CsvLogStore, catalog: &'a EntityCatalog) -> ToolState<'a> {
        ToolState {
            store,
            catalog,
            max_rows_in_result: 1000,
            max_entities_per_type: 500,
            max_samples_in_return_logs: 10,
        }
    }

    #[test]
    fn search_logs_reports_kept_of_total() {
        let store = CsvLogStore::from_rows(vec![
            row(&[("_source.log", "MAWED07T01 up"), ("timestamp", "t1"), ("severity", "INFO")]),
            row(&[("_source.log", "unrelated"), ("timestamp", "t2"), ("severity", "INFO")]),
        ]);
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let state = sample_state(&store, &catalog);

        let mut params = ToolParams::new();
        params.insert("value", ParamValue::String("MAWED07T01".to_string()));
        params.insert("rows", ParamValue::RowSet(RowSet::full(2)));

        let result = SearchLogsTool.execute(&params, &state);
        assert!(result.success);
        assert!(result.message.contains("kept 1 of 2"));
    }

    #[test]
    fn filter_by_field_missing_field_is_empty_not_error() {
        let store = CsvLogStore::from_rows(vec![row(&[("_source.log", "{}")])]);
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let state = sample_state(&store, &catalog);

        let mut params = ToolParams::new();
        params.insert("field", ParamValue::String("missing_field".to_string()));
        params.insert("value", ParamValue::String("x".to_string()));
        params.insert("rows", ParamValue::RowSet(RowSet::full(1)));

        let result = FilterByFieldTool.execute(&params, &state);
        assert!(result.success);
        match result.data {
            ToolData::Rows(rows) => assert!(rows.is_empty()),
            _ => panic!("expected Rows"),
        }
    }

    #[test]
    fn return_logs_caps_samples_at_configured_max() {
        let rows: Vec<Row> = (0..5)
            .map(|i| row(&[("_source.log", &format!("entry {i}")), ("timestamp", "t"), ("severity", "INFO")]))
            .collect();
        let store = CsvLogStore::from_rows(rows);
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let mut state = sample_state(&store, &catalog);
        state.max_samples_in_return_logs = 2;

        let mut params = ToolParams::new();
        params.insert("rows", ParamValue::RowSet(RowSet::full(5)));

        let result = ReturnLogsTool.execute(&params, &state);
        assert!(result.message.contains("Formatted 5 logs"));
        match result.data {
            ToolData::Text(text) => {
                assert!(text.contains("1. entry"));
                assert!(text.contains("2. entry"));
                assert!(!text.contains("3. entry"));
            }
            _ => panic!("expected Text"),
        }
    }

    #[test]
    fn search_logs_caps_hits_at_max_rows_in_result() {
        let rows: Vec<Row> = (0..5)
            .map(|_| row(&[("_source.log", "MAWED07T01 up"), ("timestamp", "t"), ("severity", "INFO")]))
            .collect();
        let store = CsvLogStore::from_rows(rows);
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let mut state = sample_state(&store, &catalog);
        state.max_rows_in_result = 2;

        let mut params = ToolParams::new();
        params.insert("value", ParamValue::String("MAWED07T01".to_string()));
        params.insert("rows", ParamValue::RowSet(RowSet::full(5)));

        let result = SearchLogsTool.execute(&params, &state);
        assert!(result.message.contains("kept 5 of 5"));
        assert!(result.message.contains("capped at 2"));
        match result.data {
            ToolData::Rows(rows) => assert_eq!(rows.len(), 2),
            _ => panic!("expected Rows"),
        }
    }
}
