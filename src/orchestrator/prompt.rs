//! Prompt Builder (§4.6): assembles the system prompt and the per-iteration
//! user prompt.

use crate::entities::EntityCatalog;
use crate::registry::ToolRegistry;

use super::state::OrchestratorState;

pub struct PromptBuilder<'a> {
    catalog: &'a EntityCatalog,
    registry: &'a ToolRegistry,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(catalog: &'a EntityCatalog, registry: &'a ToolRegistry) -> Self {
        Self { catalog, registry }
    }

    /// Static per query: role statement, entity alias table, tool catalog,
    /// the ReAct contract, and the explicit output rules (§4.6).
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a log-analysis assistant. You answer questions about structured \
log data by choosing one tool per turn and reasoning over its observations, \
following the ReAct pattern: Reason about what you need, Act by calling a \
tool, Observe its result, and Decide whether to continue or finalize.\n\n\
Entity type aliases:\n{}\n\n\
Available tools:\n{}\n\n\
Rules:\n\
- Output must be a single JSON object with exactly the fields reasoning, tool, \
parameters, answer, confidence, done — no prose, no code fences.\n\
- Use double quotes, no trailing commas. `tool` and `answer` may be JSON null.\n\
- If the needed information is already in the trace, set done=true and copy the \
concrete values into answer.\n\
- If a tool has failed twice with the same parameters, do not call it a third \
time with those parameters.\n",
            self.catalog.render_alias_table(),
            self.registry.describe_all(),
        )
    }

    /// Per iteration: the original query, the trace so far, and a reminder
    /// from iteration ≥ 2 onward.
    pub fn user_prompt(&self, state: &OrchestratorState) -> String {
        let mut prompt = format!("Question: {}\n\n", state.query);

        if state.trace.is_empty() {
            prompt.push_str("No steps taken yet. What should the first step be?\n");
        } else {
            prompt.push_str("Trace so far:\n");
            for step in &state.trace {
                prompt.push_str(&render_step(step));
            }
        }

        if state.iteration >= 2 {
            prompt.push_str("\nIf the observations already contain the answer, finalize now.\n");
        }

        prompt
    }
}

fn render_step(step: &crate::types::Step) -> String {
    let tool = step.decision.tool.as_deref().unwrap_or("none");
    let params = if step.decision.parameters.is_null() {
        "{}".to_string()
    } else {
        step.decision.parameters.to_string()
    };

    let mut rendered = format!(
        "iteration {} → reasoning: {} → tool: {tool}({params})",
        step.iteration, step.decision.reasoning
    );

    match (&step.result, &step.error) {
        (Some(result), _) => {
            rendered.push_str(&format!(" → observation: {}", result.message));
            if let Some(preview) = &result.data_preview {
                rendered.push_str(&format!(" → data: {preview}"));
            }
        }
        (None, Some(error)) => rendered.push_str(&format!(" → error: {error}")),
        (None, None) => {}
    }

    rendered.push('\n');
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RowSet;
    use crate::types::{Decision, Step};

    const CATALOG_TOML: &str = r#"
[patterns]
cm_mac = ["x"]
[aliases]
cm_mac = ["cable modem"]
[relationships]
cm_mac = []
"#;

    #[test]
    fn system_prompt_contains_alias_table_and_catalog() {
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let registry = ToolRegistry::with_standard_tools();
        let builder = PromptBuilder::new(&catalog, &registry);

        let system = builder.system_prompt();
        assert!(system.contains("cm_mac"));
        assert!(system.contains("search_logs"));
        assert!(system.contains("no trailing commas"));
    }

    #[test]
    fn user_prompt_adds_reminder_from_iteration_two() {
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let registry = ToolRegistry::with_standard_tools();
        let builder = PromptBuilder::new(&catalog, &registry);

        let mut state = OrchestratorState::new("count all logs".to_string(), 10, RowSet::full(3));
        state.iteration = 1;
        let first = builder.user_prompt(&state);
        assert!(!first.contains("finalize now"));

        state.iteration = 2;
        state.push_step(Step {
            iteration: 1,
            decision: Decision {
                reasoning: "need the count".to_string(),
                tool: Some("get_log_count".to_string()),
                parameters: serde_json::json!({}),
                answer: None,
                confidence: 0.0,
                done: false,
            },
            result: None,
            error: None,
            wallclock_ms: 5,
        });
        let second = builder.user_prompt(&state);
        assert!(second.contains("finalize now"));
        assert!(second.contains("get_log_count"));
    }
}
