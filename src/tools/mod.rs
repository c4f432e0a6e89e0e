//! Tool Library (§4.4): the `Tool` trait contract plus the thirteen
//! concrete tools built on the Log Store, Entity Extractor and Term
//! Normalizer.
//!
//! Grounded in the teacher's `ExecutorTool`/`ExecutorToolCall` shape and the
//! pack's `ToolSchema`/`ToolOutput` convention: a named operation with an
//! ordered parameter spec list, centrally validated by the orchestrator
//! before `execute` ever runs.

mod entity_tools;
mod finalize;
mod log_tools;
mod term_tools;

use crate::entities::EntityCatalog;
use crate::store::{LogStore, RowSet};
use crate::types::{ParamSpec, ToolParams, ToolResult};

pub use entity_tools::{AggregateEntitiesTool, CountEntitiesTool, ExtractEntitiesTool, FindEntityRelationshipsTool};
pub use finalize::FinalizeAnswerTool;
pub use log_tools::{
    FilterByFieldTool, FilterBySeverityTool, FilterByTimeTool, GetLogCountTool, ReturnLogsTool, SearchLogsTool,
};
pub use term_tools::{FuzzySearchTool, NormalizeTermTool};

/// Read-only state every tool is executed against: the backing log store,
/// the entity catalog, and the resource bounds from `EngineConfig` that cap
/// how much a tool may return.
pub struct ToolState<'a> {
    pub store: &'a dyn LogStore,
    pub catalog: &'a EntityCatalog,
    pub max_rows_in_result: usize,
    pub max_entities_per_type: usize,
    pub max_samples_in_return_logs: usize,
}

/// A tool's machine-readable description, rendered into the prompt catalog
/// by the Tool Registry (§4.5).
pub struct ToolSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub params: Vec<ParamSpec>,
    pub example: &'static str,
}

/// A named, pure operation from `(parameters, injected state)` to a
/// [`ToolResult`] (§4.4). Parameter validation is centralized in the
/// orchestrator — `execute` may assume its required parameters are present
/// and correctly typed.
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn describe(&self) -> ToolSpec;
    fn execute(&self, params: &ToolParams, state: &ToolState<'_>) -> ToolResult;
}

/// Cap a row-producing tool's output at `max_rows_in_result` (§5 Resource
/// bounds), preserving order. Returns whether truncation occurred so the
/// caller can fold a note into its message.
pub(crate) fn cap_rows(rows: RowSet, max_rows_in_result: usize) -> (RowSet, bool) {
    if rows.len() > max_rows_in_result {
        let truncated: Vec<usize> = rows.iter().take(max_rows_in_result).collect();
        (RowSet::new(truncated), true)
    } else {
        (rows, false)
    }
}
