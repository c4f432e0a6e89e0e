//! Tool Registry (§4.5): registration, lookup by name, and deterministic
//! rendering of the machine-readable tool catalog the LLM relies on.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::tools::{
    AggregateEntitiesTool, CountEntitiesTool, ExtractEntitiesTool, FilterByFieldTool, FilterBySeverityTool,
    FilterByTimeTool, FinalizeAnswerTool, FindEntityRelationshipsTool, FuzzySearchTool, GetLogCountTool,
    NormalizeTermTool, ReturnLogsTool, SearchLogsTool, Tool,
};
use crate::types::ParamKind;

/// Tools are registered in order and looked up by name. `describe_all()`
/// iterates in registration order — not `HashMap` iteration order — so the
/// rendered catalog (and therefore prompt-cache hit rate) is stable across
/// runs.
pub struct ToolRegistry {
    order: Vec<&'static str>,
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Build the registry with all thirteen tools, in the order they are
    /// documented in the tool library (§4.4).
    pub fn with_standard_tools() -> Self {
        let mut registry = Self {
            order: Vec::new(),
            tools: HashMap::new(),
        };
        registry.register(Box::new(SearchLogsTool));
        registry.register(Box::new(FilterByTimeTool));
        registry.register(Box::new(FilterBySeverityTool));
        registry.register(Box::new(FilterByFieldTool));
        registry.register(Box::new(GetLogCountTool));
        registry.register(Box::new(ExtractEntitiesTool));
        registry.register(Box::new(CountEntitiesTool));
        registry.register(Box::new(AggregateEntitiesTool));
        registry.register(Box::new(FindEntityRelationshipsTool));
        registry.register(Box::new(NormalizeTermTool));
        registry.register(Box::new(FuzzySearchTool));
        registry.register(Box::new(ReturnLogsTool));
        registry.register(Box::new(FinalizeAnswerTool));
        registry
    }

    fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name();
        self.order.push(name);
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> EngineResult<&dyn Tool> {
        self.tools
            .get(name)
            .map(|tool| tool.as_ref())
            .ok_or_else(|| EngineError::unknown_tool(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Render the full catalog in registration order: name, one-line
    /// purpose, parameters with kind/requiredness/example.
    pub fn describe_all(&self) -> String {
        let mut out = String::new();
        for name in &self.order {
            let Some(tool) = self.tools.get(name) else { continue };
            let spec = tool.describe();

            out.push_str(&format!("- {}: {}\n", spec.name, spec.summary));
            for param in &spec.params {
                let requiredness = if param.kind == ParamKind::RowSet {
                    "[OPTIONAL — auto-injected]".to_string()
                } else if param.required {
                    "[REQUIRED]".to_string()
                } else {
                    "[OPTIONAL]".to_string()
                };
                out.push_str(&format!(
                    "    {} ({}) {}: {}\n",
                    param.name,
                    param.kind.as_catalog_token(),
                    requiredness,
                    param.description
                ));
            }
            out.push_str(&format!("    example: {}\n", spec.example));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_thirteen_tools() {
        let registry = ToolRegistry::with_standard_tools();
        let expected = [
            "search_logs",
            "filter_by_time",
            "filter_by_severity",
            "filter_by_field",
            "get_log_count",
            "extract_entities",
            "count_entities",
            "aggregate_entities",
            "find_entity_relationships",
            "normalize_term",
            "fuzzy_search",
            "return_logs",
            "finalize_answer",
        ];
        assert_eq!(registry.order.len(), expected.len());
        for name in expected {
            assert!(registry.contains(name), "missing tool {name}");
        }
    }

    #[test]
    fn unknown_tool_lookup_errors() {
        let registry = ToolRegistry::with_standard_tools();
        assert!(registry.get("nonexistent").is_err());
    }

    #[test]
    fn describe_all_is_deterministic_across_calls() {
        let registry = ToolRegistry::with_standard_tools();
        assert_eq!(registry.describe_all(), registry.describe_all());
    }

    #[test]
    fn rowset_parameters_are_marked_auto_injected() {
        let registry = ToolRegistry::with_standard_tools();
        let catalog = registry.describe_all();
        assert!(catalog.contains("[OPTIONAL — auto-injected]"));
    }
}
