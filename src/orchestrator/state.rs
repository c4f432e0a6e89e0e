//! Orchestrator State (§3, §4.8 expansion): the per-query mutable container.

use std::collections::HashMap;

use crate::store::RowSet;
use crate::types::Step;

/// One per query. Created when a query arrives, handed to the orchestrator,
/// discarded after the final result is returned. No cross-query sharing.
pub struct OrchestratorState {
    pub query: String,
    pub iteration: u32,
    pub max_iterations: u32,
    pub trace: Vec<Step>,
    pub loaded_rows: RowSet,
    pub filtered_rows: Option<RowSet>,
    pub answer: Option<String>,
    pub confidence: f64,
    pub done: bool,
    /// `fingerprint → consecutive-failure count` (§4.8 step 7).
    pub failed_attempts: HashMap<String, u32>,
}

impl OrchestratorState {
    pub fn new(query: String, max_iterations: u32, loaded_rows: RowSet) -> Self {
        Self {
            query,
            iteration: 0,
            max_iterations,
            trace: Vec::new(),
            loaded_rows,
            filtered_rows: None,
            answer: None,
            confidence: 0.0,
            done: false,
            failed_attempts: HashMap::new(),
        }
    }

    pub fn push_step(&mut self, step: Step) {
        self.trace.push(step);
    }
}

/// `{success, answer, confidence, iterations, trace, logs_analyzed, error?}`
/// (§6 Result envelope).
pub struct QueryResult {
    pub success: bool,
    pub answer: String,
    pub confidence: f64,
    pub iterations: u32,
    pub trace: Vec<Step>,
    pub logs_analyzed: usize,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn terminal_error(query: &str, iterations: u32, message: String) -> Self {
        crate::logging::log_error!(query = %query, error = %message, "query terminated before the loop could start");
        Self {
            success: false,
            answer: String::new(),
            confidence: 0.0,
            iterations,
            trace: Vec::new(),
            logs_analyzed: 0,
            error: Some(message),
        }
    }
}
