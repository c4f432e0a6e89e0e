//! `EngineConfig`: all runtime knobs live here (§6 "Environment and
//! tunables"), loadable from a TOML file or from environment variables,
//! following the teacher's `LLMConfig::from_env()` convention.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Resource bounds and tunables (§5 Resource bounds, §6 Environment).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on ReAct loop iterations (default 10).
    pub max_iterations: u32,
    /// Per-LLM-call timeout, milliseconds (default 45000).
    pub llm_timeout_ms: u64,
    /// Overall query deadline, milliseconds (default 60000).
    pub query_deadline_ms: u64,
    /// Model name passed to the LLM client.
    pub llm_model: String,
    /// Path to the TOML entity catalog.
    pub entity_catalog_path: PathBuf,
    /// Path to the CSV dataset.
    pub csv_path: PathBuf,
    /// Cap on rows returned in any single tool result (default 1000).
    pub max_rows_in_result: usize,
    /// Cap on distinct values tracked per entity type (default 500).
    pub max_entities_per_type: usize,
    /// Cap on samples rendered by `return_logs` (default 10).
    pub max_samples_in_return_logs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            llm_timeout_ms: 45_000,
            query_deadline_ms: 60_000,
            llm_model: "claude-3-5-sonnet-20241022".to_string(),
            entity_catalog_path: PathBuf::from("entities.toml"),
            csv_path: PathBuf::from("logs.csv"),
            max_rows_in_result: 1000,
            max_entities_per_type: 500,
            max_samples_in_return_logs: 10,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file, falling back to defaults for absent fields.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            EngineError::config_invalid(format!("could not read config at {}: {err}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|err| EngineError::config_invalid(format!("invalid engine config TOML: {err}")))
    }

    /// Load from environment variables, falling back to defaults for any
    /// that are unset. Mirrors the teacher's `AI_PROVIDER`-style convention
    /// with a `REACTLOG_` prefix.
    pub fn from_env() -> EngineResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("REACTLOG_MAX_ITERATIONS") {
            config.max_iterations = parse_env("REACTLOG_MAX_ITERATIONS", &value)?;
        }
        if let Ok(value) = std::env::var("REACTLOG_LLM_TIMEOUT_MS") {
            config.llm_timeout_ms = parse_env("REACTLOG_LLM_TIMEOUT_MS", &value)?;
        }
        if let Ok(value) = std::env::var("REACTLOG_QUERY_DEADLINE_MS") {
            config.query_deadline_ms = parse_env("REACTLOG_QUERY_DEADLINE_MS", &value)?;
        }
        if let Ok(value) = std::env::var("REACTLOG_LLM_MODEL") {
            config.llm_model = value;
        }
        if let Ok(value) = std::env::var("REACTLOG_ENTITY_CATALOG_PATH") {
            config.entity_catalog_path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("REACTLOG_CSV_PATH") {
            config.csv_path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("REACTLOG_MAX_ROWS_IN_RESULT") {
            config.max_rows_in_result = parse_env("REACTLOG_MAX_ROWS_IN_RESULT", &value)?;
        }
        if let Ok(value) = std::env::var("REACTLOG_MAX_ENTITIES_PER_TYPE") {
            config.max_entities_per_type = parse_env("REACTLOG_MAX_ENTITIES_PER_TYPE", &value)?;
        }
        if let Ok(value) = std::env::var("REACTLOG_MAX_SAMPLES_IN_RETURN_LOGS") {
            config.max_samples_in_return_logs = parse_env("REACTLOG_MAX_SAMPLES_IN_RETURN_LOGS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.max_iterations == 0 {
            return Err(EngineError::config_invalid("max_iterations must be at least 1"));
        }
        if self.llm_timeout_ms == 0 {
            return Err(EngineError::config_invalid("llm_timeout_ms must be positive"));
        }
        if self.query_deadline_ms == 0 {
            return Err(EngineError::config_invalid("query_deadline_ms must be positive"));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> EngineResult<T> {
    value
        .parse()
        .map_err(|_| EngineError::config_invalid(format!("{name} has an invalid value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_rows_in_result, 1000);
        assert_eq!(config.max_entities_per_type, 500);
        assert_eq!(config.max_samples_in_return_logs, 10);
    }

    #[test]
    fn from_file_parses_overrides() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("reactlog-test-config-{}.toml", std::process::id()));
        std::fs::write(&path, "max_iterations = 5\nllm_model = \"test-model\"\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.llm_model, "test-model");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    #[serial]
    fn rejects_zero_max_iterations() {
        std::env::set_var("REACTLOG_MAX_ITERATIONS", "0");
        let result = EngineConfig::from_env();
        std::env::remove_var("REACTLOG_MAX_ITERATIONS");
        assert!(result.is_err());
    }
}
