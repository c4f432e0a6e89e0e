//! ReAct Orchestrator (§4.8): the state machine driving the loop.

mod prompt;
pub mod state;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::EngineConfig;
use crate::entities::EntityCatalog;
use crate::error::{EngineError, EngineResult};
use crate::internals::retry::{RetryExecutor, RetryPolicy};
use crate::llm::decision_parser::parse_decision;
use crate::llm::LlmClient;
use crate::logging::{log_debug, log_info, log_warn};
use crate::registry::ToolRegistry;
use crate::store::LogStore;
use crate::tools::ToolState;
use crate::types::{Decision, ParamKind, ParamValue, Step, ToolData, ToolParams, ToolResult, ToolResultSummary};

pub use prompt::PromptBuilder;
pub use state::{OrchestratorState, QueryResult};

/// Wires the Log Store, Entity Catalog, Tool Registry and LLM Client
/// together and drives the loop for `analyze()` (§6 external interface).
pub struct Orchestrator {
    store: Arc<dyn LogStore>,
    catalog: Arc<EntityCatalog>,
    registry: ToolRegistry,
    llm: Arc<dyn LlmClient>,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn LogStore>,
        catalog: Arc<EntityCatalog>,
        llm: Arc<dyn LlmClient>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            registry: ToolRegistry::with_standard_tools(),
            llm,
            config,
        }
    }

    /// Answer one natural-language question against the loaded dataset
    /// (§6: `analyze(query, dataset_handle) -> Result`).
    pub async fn analyze(&self, query: &str) -> QueryResult {
        let deadline = Duration::from_millis(self.config.query_deadline_ms);
        let started_at = Instant::now();

        let loaded_rows = match self.store.load().await {
            Ok(rows) => rows,
            Err(err) => {
                return QueryResult::terminal_error(query, 0, err.user_message());
            }
        };

        let mut state = OrchestratorState::new(query.to_string(), self.config.max_iterations, loaded_rows);
        let prompt_builder = PromptBuilder::new(&self.catalog, &self.registry);
        let mut retry_executor = RetryExecutor::new(RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        });
        let mut consecutive_parse_failures = 0u32;

        while state.iteration < state.max_iterations {
            if started_at.elapsed() >= deadline {
                let elapsed_ms = started_at.elapsed().as_millis() as u64;
                let err = EngineError::deadline_exceeded(elapsed_ms);
                return self.finish_with_error(state, err);
            }

            let iteration_started = Instant::now();
            state.iteration += 1;

            let system_prompt = prompt_builder.system_prompt();
            let user_prompt = prompt_builder.user_prompt(&state);

            let full_prompt = format!("{system_prompt}\n\n{user_prompt}");
            let llm_timeout = Duration::from_millis(self.config.llm_timeout_ms);

            let llm_result = tokio::time::timeout(
                llm_timeout,
                retry_executor.execute(|| self.llm.generate(&full_prompt, &self.config.llm_model)),
            )
            .await;

            let raw_reply = match llm_result {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    log_warn!(iteration = state.iteration, error = %err, "LLM call failed after retries");
                    state.push_step(Step {
                        iteration: state.iteration,
                        decision: empty_decision(),
                        result: None,
                        error: Some("llm_unreachable".to_string()),
                        wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                    });
                    continue;
                }
                Err(_timeout) => {
                    log_warn!(iteration = state.iteration, "LLM call exceeded the per-call timeout");
                    state.push_step(Step {
                        iteration: state.iteration,
                        decision: empty_decision(),
                        result: None,
                        error: Some("llm_unreachable".to_string()),
                        wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                    });
                    continue;
                }
            };

            let decision = match parse_decision(&raw_reply) {
                Ok(decision) => {
                    consecutive_parse_failures = 0;
                    decision
                }
                Err(_err) => {
                    consecutive_parse_failures += 1;
                    state.push_step(Step {
                        iteration: state.iteration,
                        decision: empty_decision(),
                        result: None,
                        error: Some("llm_parse_failed".to_string()),
                        wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                    });
                    if consecutive_parse_failures >= 3 {
                        let err = EngineError::llm_parse_failed(
                            "three consecutive iterations failed to parse reasoner output",
                            &raw_reply,
                        );
                        return self.finish_with_error(state, err);
                    }
                    continue;
                }
            };

            if decision.done {
                let Some(answer) = decision.answer.clone().filter(|a| !a.is_empty()) else {
                    state.push_step(Step {
                        iteration: state.iteration,
                        decision: decision.clone(),
                        result: None,
                        error: Some("invalid_parameter".to_string()),
                        wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                    });
                    continue;
                };
                state.answer = Some(answer.clone());
                state.confidence = decision.confidence;
                state.done = true;
                state.push_step(Step {
                    iteration: state.iteration,
                    decision,
                    result: None,
                    error: None,
                    wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                });
                log_info!(iteration = state.iteration, "query finalized");
                return self.finish(state);
            }

            let Some(tool_name) = decision.tool.clone() else {
                state.push_step(Step {
                    iteration: state.iteration,
                    decision,
                    result: None,
                    error: Some("missing_parameter".to_string()),
                    wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                });
                continue;
            };

            let tool = match self.registry.get(&tool_name) {
                Ok(tool) => tool,
                Err(_) => {
                    state.push_step(Step {
                        iteration: state.iteration,
                        decision,
                        result: None,
                        error: Some("unknown_tool".to_string()),
                        wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                    });
                    continue;
                }
            };

            let spec = tool.describe();
            let mut params = ToolParams::new();
            let params_json = decision.parameters.clone();

            let mut validation_error = None;
            for param_spec in &spec.params {
                let provided = params_json.get(param_spec.name);

                if param_spec.kind == ParamKind::RowSet && provided.is_none() {
                    let injected = auto_inject_rowset(&tool_name, &state);
                    params.insert(param_spec.name, ParamValue::RowSet(injected));
                    continue;
                }

                match (provided, param_spec.required) {
                    (None, true) => {
                        validation_error = Some(EngineError::missing_parameter(&tool_name, param_spec.name));
                        break;
                    }
                    (None, false) => continue,
                    (Some(value), _) => match coerce_param(param_spec.kind, value) {
                        Ok(coerced) => params.insert(param_spec.name, coerced),
                        Err(message) => {
                            validation_error =
                                Some(EngineError::invalid_parameter(&tool_name, param_spec.name, message));
                            break;
                        }
                    },
                }
            }

            if let Some(err) = validation_error {
                let error_kind = match &err {
                    EngineError::MissingParameter { .. } => "missing_parameter",
                    _ => "invalid_parameter",
                };
                state.push_step(Step {
                    iteration: state.iteration,
                    decision,
                    result: None,
                    error: Some(error_kind.to_string()),
                    wallclock_ms: iteration_started.elapsed().as_millis() as u64,
                });
                continue;
            }

            let fingerprint = fingerprint_call(&tool_name, &params_json);
            let failures = state.failed_attempts.get(&fingerprint).copied().unwrap_or(0);

            let (result, error_kind) = if failures >= 2 {
                let _ = EngineError::loop_detected(&tool_name);
                (
                    ToolResult::failure("skipped: this call has failed twice already — try a different approach"),
                    Some("loop_detected"),
                )
            } else {
                let tool_state = ToolState {
                    store: self.store.as_ref(),
                    catalog: &self.catalog,
                    max_rows_in_result: self.config.max_rows_in_result,
                    max_entities_per_type: self.config.max_entities_per_type,
                    max_samples_in_return_logs: self.config.max_samples_in_return_logs,
                };
                let result = tool.execute(&params, &tool_state);
                let kind = if result.success { None } else { Some("tool_execution_failed") };
                (result, kind)
            };

            if let ToolData::Rows(ref rows) = result.data {
                state.filtered_rows = Some(rows.clone());
            }

            if !result.success {
                *state.failed_attempts.entry(fingerprint).or_insert(0) += 1;
            }

            let summary = ToolResultSummary::from(&result);
            state.push_step(Step {
                iteration: state.iteration,
                decision,
                result: Some(summary),
                error: error_kind.map(str::to_string),
                wallclock_ms: iteration_started.elapsed().as_millis() as u64,
            });
        }

        let err = EngineError::iteration_exhausted(state.max_iterations);
        self.finish_with_error(state, err)
    }

    fn finish(&self, state: OrchestratorState) -> QueryResult {
        let logs_analyzed = state
            .filtered_rows
            .as_ref()
            .map(|rows| self.store.count(rows))
            .unwrap_or_else(|| self.store.count(&state.loaded_rows));

        QueryResult {
            success: state.done,
            answer: state.answer.unwrap_or_default(),
            confidence: state.confidence,
            iterations: state.iteration,
            trace: state.trace,
            logs_analyzed,
            error: None,
        }
    }

    fn finish_with_error(&self, state: OrchestratorState, err: EngineError) -> QueryResult {
        let logs_analyzed = state
            .filtered_rows
            .as_ref()
            .map(|rows| self.store.count(rows))
            .unwrap_or_else(|| self.store.count(&state.loaded_rows));

        QueryResult {
            success: false,
            answer: state.answer.unwrap_or_default(),
            confidence: state.confidence,
            iterations: state.iteration,
            trace: state.trace,
            logs_analyzed,
            error: Some(err.user_message()),
        }
    }
}

fn empty_decision() -> Decision {
    Decision {
        reasoning: String::new(),
        tool: None,
        parameters: Value::Null,
        answer: None,
        confidence: 0.0,
        done: false,
    }
}

/// Fill an absent `rowset` parameter (§4.8 step 5). `search_logs` always
/// starts from `loaded_rows` (§4.4 table); every other row-consuming tool
/// prefers `filtered_rows`, falling back to `loaded_rows`.
fn auto_inject_rowset(tool_name: &str, state: &OrchestratorState) -> crate::store::RowSet {
    if tool_name == "search_logs" {
        return state.loaded_rows.clone();
    }
    state
        .filtered_rows
        .clone()
        .unwrap_or_else(|| state.loaded_rows.clone())
}

/// Coerce a raw `serde_json::Value` parameter into a typed `ParamValue`,
/// per the declared `kind` (§9: "dynamic typed parameters become a closed
/// kind enum with per-kind validators").
fn coerce_param(kind: ParamKind, value: &Value) -> Result<ParamValue, String> {
    match kind {
        ParamKind::String => value
            .as_str()
            .map(|s| ParamValue::String(s.to_string()))
            .ok_or_else(|| "expected a string".to_string()),
        ParamKind::Integer => value
            .as_i64()
            .map(ParamValue::Integer)
            .ok_or_else(|| "expected an integer".to_string()),
        ParamKind::List => value
            .as_array()
            .map(|items| {
                ParamValue::List(
                    items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                        .collect(),
                )
            })
            .ok_or_else(|| "expected a list".to_string()),
        ParamKind::Dict => Ok(ParamValue::Dict(value.clone())),
        ParamKind::RowSet => Err("rowset parameters are auto-injected, not LLM-provided".to_string()),
    }
}

/// `(tool_name, canonical-JSON of parameters minus rowset)` (§4.8 step 7,
/// Glossary "Failure fingerprint").
fn fingerprint_call(tool_name: &str, params: &Value) -> String {
    let mut canonical = params.clone();
    if let Some(obj) = canonical.as_object_mut() {
        obj.retain(|key, _| key != "rows");
        let sorted: std::collections::BTreeMap<String, Value> = obj.clone().into_iter().collect();
        *obj = sorted.into_iter().collect();
    }
    format!("{tool_name}:{canonical}")
}
