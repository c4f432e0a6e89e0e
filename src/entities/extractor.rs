//! The extraction algorithm itself (§4.2).

use std::collections::{HashMap, HashSet};

use crate::entities::catalog::EntityCatalog;
use crate::store::{LogStore, RowSet};

/// `type → ordered unique list of values`, plus for each value the set of
/// row indices (within the source row set) it was found in.
#[derive(Debug, Default, Clone)]
pub struct EntityOccurrenceMap {
    values: HashMap<String, Vec<String>>,
    occurrences: HashMap<(String, String), HashSet<usize>>,
    /// Entity type names the caller asked for that the catalog does not
    /// recognize — surfaced as a warning in the tool message, not an error.
    pub unknown_types: Vec<String>,
}

impl EntityOccurrenceMap {
    pub fn values_for(&self, entity_type: &str) -> &[String] {
        self.values
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn types(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }

    pub fn rows_for(&self, entity_type: &str, value: &str) -> HashSet<usize> {
        self.occurrences
            .get(&(entity_type.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&mut self, entity_type: &str, value: String, row_index: usize) {
        let entry = self.values.entry(entity_type.to_string()).or_default();
        if !entry.contains(&value) {
            entry.push(value.clone());
        }
        self.occurrences
            .entry((entity_type.to_string(), value))
            .or_default()
            .insert(row_index);
    }
}

/// Run extraction for `entity_types` over `rowset`. Types absent from the
/// catalog are recorded in `unknown_types` and otherwise skipped — not an
/// error (§4.4: `extract_entities`'s "unknown type names are skipped with a
/// warning in the message").
pub fn extract_entities(
    catalog: &EntityCatalog,
    store: &dyn LogStore,
    rowset: &RowSet,
    entity_types: &[String],
) -> EntityOccurrenceMap {
    let mut map = EntityOccurrenceMap::default();

    for entity_type in entity_types {
        let Some(spec) = catalog.get(entity_type) else {
            map.unknown_types.push(entity_type.clone());
            continue;
        };

        for row_index in rowset.iter() {
            let Some(row) = store.row(row_index) else {
                continue;
            };

            for column in &spec.scan_columns {
                let Some(text) = row.field(column) else {
                    continue;
                };

                for pattern in &spec.patterns {
                    for captures in pattern.captures_iter(text) {
                        let value = captures
                            .get(1)
                            .or_else(|| captures.get(0))
                            .map(|m| m.as_str().to_string());
                        if let Some(value) = value {
                            map.record(entity_type, value, row_index);
                        }
                    }
                }
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CsvLogStore, Row};
    use std::collections::HashMap as StdHashMap;

    const CATALOG_TOML: &str = r#"
[patterns]
cm_mac = ["(?i)\\b([0-9a-f]{2}(?::[0-9a-f]{2}){5})\\b"]
cpe_ip = ["\\b((?:[0-9a-fA-F]{1,4}:){2,7}[0-9a-fA-F]{1,4})\\b"]
cpe_mac = ["(?i)\\b([0-9a-f]{2}(?::[0-9a-f]{2}){5})\\b"]

[aliases]
cm_mac = ["cable modem"]
cpe_ip = ["cpe"]
cpe_mac = ["cpe mac"]

[relationships]
cm_mac = []
cpe_ip = []
cpe_mac = []
"#;

    fn row(fields: &[(&str, &str)]) -> Row {
        let map: StdHashMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Row::from_fields(map)
    }

    #[test]
    fn dedups_preserving_first_seen_order() {
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let store = CsvLogStore::from_rows(vec![
            row(&[(
                "_source.log",
                r#"{"CmMacAddress":"1c:93:7c:2a:72:c3"}"#,
            )]),
            row(&[(
                "_source.log",
                r#"{"CmMacAddress":"1c:93:7c:2a:72:c3"}"#,
            )]),
            row(&[(
                "_source.log",
                r#"{"CmMacAddress":"28:7a:ee:c9:66:4a"}"#,
            )]),
        ]);
        let rowset = RowSet::full(3);

        let result = extract_entities(&catalog, &store, &rowset, &["cm_mac".to_string()]);
        assert_eq!(
            result.values_for("cm_mac"),
            &["1c:93:7c:2a:72:c3".to_string(), "28:7a:ee:c9:66:4a".to_string()]
        );
        assert_eq!(result.rows_for("cm_mac", "1c:93:7c:2a:72:c3").len(), 2);
    }

    #[test]
    fn unknown_types_are_recorded_not_errored() {
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let store = CsvLogStore::from_rows(vec![row(&[("_source.log", "{}")])]);
        let rowset = RowSet::full(1);

        let result = extract_entities(&catalog, &store, &rowset, &["bogus_type".to_string()]);
        assert_eq!(result.unknown_types, vec!["bogus_type".to_string()]);
        assert!(result.values_for("bogus_type").is_empty());
    }

    #[test]
    fn mac_pattern_does_not_match_inside_ipv6_literal() {
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let store = CsvLogStore::from_rows(vec![row(&[(
            "_source.log",
            r#"{"CpeIpAddress":"2001:558:6017:60:4950:96e8:be4f:f63b"}"#,
        )])]);
        let rowset = RowSet::full(1);

        let macs = extract_entities(&catalog, &store, &rowset, &["cpe_mac".to_string()]);
        assert!(macs.values_for("cpe_mac").is_empty());

        let ips = extract_entities(&catalog, &store, &rowset, &["cpe_ip".to_string()]);
        assert_eq!(
            ips.values_for("cpe_ip"),
            &["2001:558:6017:60:4950:96e8:be4f:f63b".to_string()]
        );
    }

    #[test]
    fn infrastructure_columns_are_not_scanned() {
        let catalog = EntityCatalog::from_toml_str(CATALOG_TOML).unwrap();
        let store = CsvLogStore::from_rows(vec![row(&[
            ("_source.log", "{}"),
            ("pod_ip", "172.17.13.5"),
        ])]);
        let rowset = RowSet::full(1);

        let result = extract_entities(&catalog, &store, &rowset, &["cpe_ip".to_string()]);
        assert!(result.values_for("cpe_ip").is_empty());
    }
}
