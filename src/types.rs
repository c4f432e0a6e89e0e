//! Shared domain types: the Decision/Step/ToolResult vocabulary the
//! orchestrator, prompt builder, and tool library all speak (§3 of the
//! design).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::RowSet;

/// The closed set of parameter kinds a tool can declare (§4.4, §9 "dynamic
/// typed parameters become a closed kind enum").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    List,
    RowSet,
    Dict,
}

impl ParamKind {
    /// Render as the LLM-facing uppercase token used in the tool catalog.
    pub fn as_catalog_token(&self) -> &'static str {
        match self {
            ParamKind::String => "STRING",
            ParamKind::Integer => "INTEGER",
            ParamKind::List => "LIST",
            ParamKind::RowSet => "ROWSET",
            ParamKind::Dict => "DICT",
        }
    }
}

/// One parameter a tool declares.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub example: &'static str,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn new(
        name: &'static str,
        kind: ParamKind,
        required: bool,
        example: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required,
            example,
            description,
        }
    }
}

/// A concrete value bound to a tool parameter, after validation.
///
/// Separate from `serde_json::Value` so a `RowSet` can be carried without a
/// serialization round trip — auto-injection (§4.8 step 5) hands the
/// orchestrator's cached row set directly to the tool.
#[derive(Debug, Clone)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    List(Vec<String>),
    RowSet(RowSet),
    Dict(serde_json::Value),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_rowset(&self) -> Option<&RowSet> {
        match self {
            ParamValue::RowSet(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::String(_) => ParamKind::String,
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::List(_) => ParamKind::List,
            ParamValue::RowSet(_) => ParamKind::RowSet,
            ParamValue::Dict(_) => ParamKind::Dict,
        }
    }
}

/// A bag of validated parameter values keyed by name, passed to `Tool::execute`.
#[derive(Debug, Clone, Default)]
pub struct ToolParams {
    values: HashMap<String, ParamValue>,
}

impl ToolParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_integer)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(ParamValue::as_list)
    }

    pub fn rowset(&self, name: &str) -> Option<&RowSet> {
        self.get(name).and_then(ParamValue::as_rowset)
    }
}

/// The output produced by a tool (§3: Tool Result).
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    pub data: ToolData,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>, data: ToolData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: message.clone(),
            data: ToolData::None,
            error: Some(message),
        }
    }
}

/// The payload carried by a `ToolResult` — exactly the shapes named in §3.
#[derive(Debug, Clone)]
pub enum ToolData {
    None,
    Rows(RowSet),
    Count(usize),
    StringList(Vec<String>),
    TypeValues(HashMap<String, Vec<String>>),
    ValueCounts(HashMap<String, usize>),
    Aggregate(HashMap<String, TypeAggregate>),
    Text(String),
}

/// Per-type aggregate produced by `aggregate_entities`.
#[derive(Debug, Clone, Serialize)]
pub struct TypeAggregate {
    pub count: usize,
    pub values: Vec<String>,
}

/// The structured JSON the LLM must emit each iteration (§3: Decision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    pub done: bool,
}

/// One iteration of the trace (§3: Step) — appended, never rewritten.
#[derive(Debug, Clone)]
pub struct Step {
    pub iteration: u32,
    pub decision: Decision,
    pub result: Option<ToolResultSummary>,
    pub error: Option<String>,
    pub wallclock_ms: u64,
}

/// A trace-friendly snapshot of a `ToolResult` — rows are summarized rather
/// than carried whole, bounding prompt-context cost (§9 Design Notes).
#[derive(Debug, Clone)]
pub struct ToolResultSummary {
    pub success: bool,
    pub message: String,
    pub data_preview: Option<serde_json::Value>,
}

impl From<&ToolResult> for ToolResultSummary {
    fn from(result: &ToolResult) -> Self {
        let data_preview = match &result.data {
            ToolData::None => None,
            ToolData::Rows(rows) => Some(serde_json::json!({ "row_count": rows.len() })),
            ToolData::Count(n) => Some(serde_json::json!(n)),
            ToolData::StringList(items) => Some(serde_json::json!(items)),
            ToolData::TypeValues(map) => Some(serde_json::to_value(map).unwrap_or_default()),
            ToolData::ValueCounts(map) => Some(serde_json::to_value(map).unwrap_or_default()),
            ToolData::Aggregate(map) => Some(serde_json::to_value(map).unwrap_or_default()),
            ToolData::Text(text) => Some(serde_json::json!(text)),
        };
        Self {
            success: result.success,
            message: result.message.clone(),
            data_preview,
        }
    }
}
