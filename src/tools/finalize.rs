//! `finalize_answer` (§4.4): signals loop termination. The orchestrator
//! treats a `done=true` Decision as the primary termination path (§4.8 step
//! 4); this tool exists so the catalog and trace render termination the
//! same way every other tool call is rendered.

use crate::types::{ParamKind, ParamSpec, ToolData, ToolParams, ToolResult};

use super::{Tool, ToolSpec, ToolState};

pub struct FinalizeAnswerTool;

impl Tool for FinalizeAnswerTool {
    fn name(&self) -> &'static str {
        "finalize_answer"
    }

    fn describe(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            summary: "Signal that a final answer is ready",
            params: vec![ParamSpec::new(
                "answer",
                ParamKind::String,
                true,
                "\"2115 logs total\"",
                "the final answer text (confidence is read from the Decision's top-level field, not a tool parameter)",
            )],
            example: "{\"answer\": \"2115 logs total\"}",
        }
    }

    fn execute(&self, params: &ToolParams, _state: &ToolState<'_>) -> ToolResult {
        let Some(answer) = params.string("answer") else {
            return ToolResult::failure("finalize_answer requires a non-empty answer");
        };
        if answer.is_empty() {
            return ToolResult::failure("finalize_answer requires a non-empty answer");
        }

        ToolResult::ok("Answer provided", ToolData::Text(answer.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityCatalog;
    use crate::store::CsvLogStore;
    use crate::types::ParamValue;

    #[test]
    fn rejects_empty_answer() {
        let catalog = EntityCatalog::from_toml_str(
            "[patterns]\ncm_mac = [\"x\"]\n[aliases]\ncm_mac = [\"cm\"]\n[relationships]\ncm_mac = []\n",
        )
        .unwrap();
        let store = CsvLogStore::from_rows(vec![]);
        let state = ToolState {
            store: &store,
            catalog: &catalog,
            max_rows_in_result: 1000,
            max_entities_per_type: 500,
            max_samples_in_return_logs: 10,
        };

        let mut params = ToolParams::new();
        params.insert("answer", ParamValue::String(String::new()));

        let result = FinalizeAnswerTool.execute(&params, &state);
        assert!(!result.success);
    }
}
