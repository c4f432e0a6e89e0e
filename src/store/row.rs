//! The `Row` type and severity ordinal (§3 Data Model).

use std::collections::HashMap;
use std::str::FromStr;

/// Severity ordinal, ordered `DEBUG < INFO < WARNING < ERROR < CRITICAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" | "CRIT" | "FATAL" => Ok(Severity::Critical),
            _ => Err(()),
        }
    }
}

/// One ingested CSV row. Read-only after construction.
///
/// `fields` holds every column's raw string value, keyed by column name
/// (including `_source.log`, `timestamp`, `severity`, and any number of
/// infrastructure columns). `payload` is the best-effort JSON parse of
/// `_source.log` — a row with unparsable payload still participates in
/// substring/time/severity/field filters, it simply contributes no entities.
#[derive(Debug, Clone)]
pub struct Row {
    pub fields: HashMap<String, String>,
    pub payload: Option<serde_json::Value>,
    pub timestamp: Option<String>,
    pub severity: Option<Severity>,
}

impl Row {
    pub const PAYLOAD_COLUMN: &'static str = "_source.log";

    pub fn from_fields(fields: HashMap<String, String>) -> Self {
        let payload = fields
            .get(Self::PAYLOAD_COLUMN)
            .and_then(|raw| serde_json::from_str(raw).ok());
        let timestamp = fields.get("timestamp").cloned();
        let severity = fields
            .get("severity")
            .and_then(|raw| Severity::from_str(raw).ok());

        Self {
            fields,
            payload,
            timestamp,
            severity,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A single-line, truncated rendering used by `return_logs` samples.
    pub fn preview(&self, max_chars: usize) -> String {
        let rendered = self
            .field(Self::PAYLOAD_COLUMN)
            .unwrap_or_default();
        if rendered.chars().count() > max_chars {
            let truncated: String = rendered.chars().take(max_chars).collect();
            format!("{truncated}…")
        } else {
            rendered.to_string()
        }
    }

    /// Concatenation of every column's string form, used by
    /// `search_substring` when no columns are named.
    pub fn searchable_text(&self) -> String {
        let mut combined = String::new();
        for value in self.fields.values() {
            combined.push_str(value);
            combined.push(' ');
        }
        combined
    }
}
