//! TOML-backed `EntityCatalog` (§4.2 expansion, §6 concrete format).

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::logging::log_info;

/// Raw, pre-compilation shape of the entity configuration document.
#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    patterns: HashMap<String, Vec<String>>,
    #[serde(default)]
    aliases: HashMap<String, Vec<String>>,
    #[serde(default)]
    relationships: HashMap<String, Vec<String>>,
}

/// A single entity type's compiled configuration.
pub struct EntityTypeSpec {
    pub name: String,
    pub patterns: Vec<Regex>,
    pub aliases: Vec<String>,
    pub related_types: Vec<String>,
    /// Columns this type's patterns scan. Defaults to `["_source.log"]`;
    /// never includes infrastructure/metadata columns.
    pub scan_columns: Vec<String>,
}

/// The frozen, process-wide read-only catalog of entity types.
///
/// Compiled once at construction; a malformed document or regex is a fatal
/// `config_invalid` error, never raised mid-query.
pub struct EntityCatalog {
    types: HashMap<String, EntityTypeSpec>,
    /// Registration order, for deterministic rendering in the prompt.
    order: Vec<String>,
}

impl EntityCatalog {
    /// Load and compile the catalog from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            EngineError::config_invalid(format!(
                "could not read entity catalog at {}: {err}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse and compile the catalog from a TOML document in memory.
    pub fn from_toml_str(document: &str) -> EngineResult<Self> {
        let raw: RawCatalog = toml::from_str(document)
            .map_err(|err| EngineError::config_invalid(format!("invalid entity catalog TOML: {err}")))?;

        if raw.patterns.is_empty() {
            return Err(EngineError::config_invalid(
                "entity catalog must declare at least one [patterns] entry",
            ));
        }

        let mut order = Vec::new();
        let mut types = HashMap::new();

        for (name, pattern_strs) in &raw.patterns {
            if pattern_strs.is_empty() {
                return Err(EngineError::config_invalid(format!(
                    "entity type {name} has no patterns configured"
                )));
            }

            let mut patterns = Vec::with_capacity(pattern_strs.len());
            for pattern in pattern_strs {
                let compiled = Regex::new(pattern).map_err(|err| {
                    EngineError::config_invalid(format!(
                        "entity type {name} has an invalid regex {pattern:?}: {err}"
                    ))
                })?;
                patterns.push(compiled);
            }

            let aliases = raw.aliases.get(name).cloned().unwrap_or_default();
            if aliases.is_empty() {
                return Err(EngineError::config_invalid(format!(
                    "entity type {name} must declare at least one alias"
                )));
            }

            let related_types = raw.relationships.get(name).cloned().unwrap_or_default();

            order.push(name.clone());
            types.insert(
                name.clone(),
                EntityTypeSpec {
                    name: name.clone(),
                    patterns,
                    aliases,
                    related_types,
                    scan_columns: vec![crate::store::Row::PAYLOAD_COLUMN.to_string()],
                },
            );
        }

        order.sort();

        log_info!(entity_type_count = order.len(), "compiled entity catalog");

        Ok(Self { types, order })
    }

    pub fn get(&self, name: &str) -> Option<&EntityTypeSpec> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All type names in stable (alphabetical) order.
    pub fn type_names(&self) -> &[String] {
        &self.order
    }

    /// Render the alias table for the system prompt, e.g.
    /// `User says 'cm' or 'cable modem' → use 'cm_mac'`.
    pub fn render_alias_table(&self) -> String {
        let mut lines = Vec::new();
        for name in &self.order {
            let Some(spec) = self.types.get(name) else {
                continue;
            };
            let quoted = spec
                .aliases
                .iter()
                .map(|alias| format!("'{alias}'"))
                .collect::<Vec<_>>()
                .join(" or ");
            lines.push(format!("User says {quoted} → use '{name}'"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[patterns]
cm_mac = ["(?i)\\b([0-9a-f]{2}(?::[0-9a-f]{2}){5})\\b"]
rpdname = ["\"rpdname\"\\s*:\\s*\"([A-Za-z0-9_-]+)\""]
cpe_ip = ["\\b((?:[0-9a-fA-F]{1,4}:){2,7}[0-9a-fA-F]{1,4})\\b", "\\b(\\d{1,3}(?:\\.\\d{1,3}){3})\\b"]

[aliases]
cm_mac = ["cable modem", "cm", "modem mac"]
rpdname = ["rpd", "remote phy device"]
cpe_ip = ["cpe", "cpe ip", "customer ip"]

[relationships]
cm_mac = ["rpdname"]
rpdname = ["cm_mac"]
cpe_ip = ["cm_mac"]
"#;

    #[test]
    fn loads_and_compiles_sample_catalog() {
        let catalog = EntityCatalog::from_toml_str(SAMPLE).unwrap();
        assert!(catalog.contains("cm_mac"));
        assert!(catalog.contains("rpdname"));
        assert!(catalog.contains("cpe_ip"));
        assert_eq!(catalog.type_names().len(), 3);
    }

    #[test]
    fn rejects_malformed_regex() {
        let bad = SAMPLE.replace(
            "(?i)\\b([0-9a-f]{2}(?::[0-9a-f]{2}){5})\\b",
            "(unbalanced[",
        );
        assert!(EntityCatalog::from_toml_str(&bad).is_err());
    }

    #[test]
    fn rejects_type_with_no_aliases() {
        let missing_alias = SAMPLE.replace("cm_mac = [\"cable modem\", \"cm\", \"modem mac\"]", "");
        assert!(EntityCatalog::from_toml_str(&missing_alias).is_err());
    }

    #[test]
    fn alias_table_mentions_every_type() {
        let catalog = EntityCatalog::from_toml_str(SAMPLE).unwrap();
        let table = catalog.render_alias_table();
        assert!(table.contains("cm_mac"));
        assert!(table.contains("rpdname"));
        assert!(table.contains("cpe_ip"));
    }
}
