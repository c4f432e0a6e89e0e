//! Entity-producing tools (§4.4): `extract_entities`, `count_entities`,
//! `aggregate_entities`, `find_entity_relationships`.

use std::collections::HashMap;

use crate::entities::extract_entities as run_extraction;
use crate::types::{ParamKind, ParamSpec, ToolData, ToolParams, ToolResult, TypeAggregate};

use super::{Tool, ToolSpec, ToolState};

fn format_examples(values: &[String], limit: usize) -> String {
    let shown: Vec<&str> = values.iter().take(limit).map(String::as_str).collect();
    let mut text = shown.join(", ");
    if values.len() > limit {
        text.push_str(&format!(" (and {} more)", values.len() - limit));
    }
    text
}

fn capped(values: &[String], max_entities_per_type: usize) -> Vec<String> {
    values.iter().take(max_entities_per_type).cloned().collect()
}

/// Run extraction for one or more types over injected rows (§4.2). Unknown
/// type names are skipped with a warning folded into the message, not an
/// error.
pub struct ExtractEntitiesTool;

impl Tool for ExtractEntitiesTool {
    fn name(&self) -> &'static str {
        "extract_entities"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Extract entity values of the given types from the current row set",
            params: vec![
                ParamSpec::new("entity_types", ParamKind::List, true, "[\"cm_mac\"]", "entity type names to extract"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to scan (auto-injected)"),
            ],
            example: "{\"entity_types\": [\"cm_mac\"]}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("extract_entities has no row set to scan");
        };
        let Some(entity_types) = params.list("entity_types") else {
            return ToolResult::failure("extract_entities requires a non-empty entity_types list");
        };
        if entity_types.is_empty() {
            return ToolResult::failure("extract_entities requires a non-empty entity_types list");
        }

        let occurrences = run_extraction(state.catalog, state.store, rows, entity_types);

        let mut type_values: HashMap<String, Vec<String>> = HashMap::new();
        let mut message_parts = Vec::new();
        for entity_type in entity_types {
            if occurrences.unknown_types.contains(entity_type) {
                continue;
            }
            let values = capped(occurrences.values_for(entity_type), state.max_entities_per_type);
            message_parts.push(format!(
                "{entity_type}: {} values [{}]",
                values.len(),
                format_examples(&values, 3)
            ));
            type_values.insert(entity_type.clone(), values);
        }

        let mut message = message_parts.join("; ");
        if !occurrences.unknown_types.is_empty() {
            message.push_str(&format!(
                "; warning: unknown entity types skipped: {}",
                occurrences.unknown_types.join(", ")
            ));
        }
        if message.is_empty() {
            message = "no entities extracted".to_string();
        }

        ToolResult::ok(message, ToolData::TypeValues(type_values))
    }
}

/// Per-value frequency for a single entity type over injected rows.
pub struct CountEntitiesTool;

impl Tool for CountEntitiesTool {
    fn name(&self) -> &'static str {
        "count_entities"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Count occurrences of each value of one entity type",
            params: vec![
                ParamSpec::new("entity_type", ParamKind::String, true, "\"cm_mac\"", "entity type to count"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to scan (auto-injected)"),
            ],
            example: "{\"entity_type\": \"cm_mac\"}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("count_entities has no row set to scan");
        };
        let Some(entity_type) = params.string("entity_type") else {
            return ToolResult::failure("count_entities requires an entity_type");
        };
        if !state.catalog.contains(entity_type) {
            return ToolResult::failure(format!("unknown entity type: {entity_type}"));
        }

        let occurrences = run_extraction(state.catalog, state.store, rows, &[entity_type.to_string()]);
        let mut counts = HashMap::new();
        for value in occurrences.values_for(entity_type) {
            let count = occurrences.rows_for(entity_type, value).len();
            counts.insert(value.clone(), count);
        }

        let total: usize = counts.values().sum();
        ToolResult::ok(
            format!("{entity_type}: {} distinct values, {total} total occurrences", counts.len()),
            ToolData::ValueCounts(counts),
        )
    }
}

/// Union of extraction over multiple types, with per-type counts (§4.4).
pub struct AggregateEntitiesTool;

impl Tool for AggregateEntitiesTool {
    fn name(&self) -> &'static str {
        "aggregate_entities"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Extract several entity types at once, with per-type counts",
            params: vec![
                ParamSpec::new("entity_types", ParamKind::List, true, "[\"cm_mac\", \"rpdname\"]", "entity type names"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to scan (auto-injected)"),
            ],
            example: "{\"entity_types\": [\"cm_mac\", \"rpdname\"]}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("aggregate_entities has no row set to scan");
        };
        let Some(entity_types) = params.list("entity_types") else {
            return ToolResult::failure("aggregate_entities requires a non-empty entity_types list");
        };
        if entity_types.is_empty() {
            return ToolResult::failure("aggregate_entities requires a non-empty entity_types list");
        }

        let occurrences = run_extraction(state.catalog, state.store, rows, entity_types);

        let mut aggregate = HashMap::new();
        let mut message_parts = Vec::new();
        for entity_type in entity_types {
            if occurrences.unknown_types.contains(entity_type) {
                continue;
            }
            let values = capped(occurrences.values_for(entity_type), state.max_entities_per_type);
            message_parts.push(format!("{entity_type}={}", values.len()));
            aggregate.insert(
                entity_type.clone(),
                TypeAggregate {
                    count: values.len(),
                    values,
                },
            );
        }

        ToolResult::ok(format!("aggregated: {}", message_parts.join(", ")), ToolData::Aggregate(aggregate))
    }
}

/// Rows mentioning `target_value`, then extract `related_types` over that
/// subset (§4.4) — the bridge-search primitive the LLM chains across
/// iterations.
pub struct FindEntityRelationshipsTool;

impl Tool for FindEntityRelationshipsTool {
    fn name(&self) -> &'static str {
        "find_entity_relationships"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Find values of related entity types co-occurring with a target value",
            params: vec![
                ParamSpec::new("target_value", ParamKind::String, true, "\"1c:93:7c:2a:72:c3\"", "value to anchor the search on"),
                ParamSpec::new("related_types", ParamKind::List, true, "[\"rpdname\"]", "entity types to extract from co-occurring rows"),
                ParamSpec::new("rows", ParamKind::RowSet, false, "", "row set to scan (auto-injected)"),
            ],
            example: "{\"target_value\": \"1c:93:7c:2a:72:c3\", \"related_types\": [\"rpdname\"]}",
        }
    }

    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult {
        let Some(rows) = params.rowset("rows") else {
            return ToolResult::failure("find_entity_relationships has no row set to scan");
        };
        let Some(target_value) = params.string("target_value") else {
            return ToolResult::failure("find_entity_relationships requires target_value");
        };
        let related_types: Vec<String> = params.list("related_types").map(<[String]>::to_vec).unwrap_or_default();

        let co_occurring = match state.store.search_substring(rows, target_value, &[]) {
            Ok(hits) => hits,
            Err(err) => return ToolResult::failure(err.to_string()),
        };

        if co_occurring.is_empty() {
            return ToolResult::ok(
                format!("no rows mention {target_value:?}"),
                ToolData::TypeValues(HashMap::new()),
            );
        }

        let occurrences = run_extraction(state.catalog, state.store, &co_occurring, &related_types);
        let mut type_values = HashMap::new();
        let mut message_parts = vec![format!("{} co-occurring rows", co_occurring.len())];
        for entity_type in &related_types {
            if occurrences.unknown_types.contains(entity_type) {
                continue;
            }
            let values = capped(occurrences.values_for(entity_type), state.max_entities_per_type);
            message_parts.push(format!("{entity_type}: [{}]", format_examples(&values, 3)));
            type_values.insert(entity_type.clone(), values);
        }

        ToolResult::ok(message_parts.join("; "), ToolData::TypeValues(type_values))
    }
}
