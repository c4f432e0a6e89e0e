//! Term Normalizer (§4.3): a static synonym map plus a fuzzy search that
//! unions substring search across every variant.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::EngineResult;
use crate::store::{LogStore, RowSet};

/// Canonical term → surface variants. Seeded with the `error` family from
/// the distilled spec plus a handful of additional domain terms this log
/// corpus commonly pages on.
static SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("error", &["err", "fail", "failure", "exception", "critical"][..]),
        ("timeout", &["timed out", "expired"][..]),
        ("reboot", &["restart", "reset", "rebooted"][..]),
        ("registration", &["reg", "register", "registering"][..]),
    ])
});

/// Expand `term` through the synonym map. Always includes `term` itself,
/// even when no entry exists.
pub fn normalize(term: &str) -> Vec<String> {
    let lower = term.to_lowercase();
    let mut variants = vec![term.to_string()];

    if let Some(extra) = SYNONYMS.get(lower.as_str()) {
        for variant in *extra {
            if !variants.iter().any(|v| v == variant) {
                variants.push(variant.to_string());
            }
        }
    }

    variants
}

/// Union (by row identity) of `search_substring(rowset, variant)` over every
/// variant of `term`, preserving original row ordering.
pub fn fuzzy_search(
    store: &dyn LogStore,
    rowset: &RowSet,
    term: &str,
) -> EngineResult<RowSet> {
    let variants = normalize(term);
    let mut seen = std::collections::HashSet::new();
    let mut kept = Vec::new();

    for index in rowset.iter() {
        let single = RowSet::new(vec![index]);
        for variant in &variants {
            if store
                .search_substring(&single, variant, &[])
                .map(|hits| !hits.is_empty())
                .unwrap_or(false)
            {
                if seen.insert(index) {
                    kept.push(index);
                }
                break;
            }
        }
    }

    Ok(RowSet::new(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CsvLogStore, Row};
    use std::collections::HashMap as StdHashMap;

    fn row(log: &str) -> Row {
        let mut map = StdHashMap::new();
        map.insert("_source.log".to_string(), log.to_string());
        Row::from_fields(map)
    }

    #[test]
    fn normalize_always_includes_the_term() {
        let variants = normalize("banana");
        assert_eq!(variants, vec!["banana".to_string()]);
    }

    #[test]
    fn normalize_expands_known_terms() {
        let variants = normalize("registration");
        assert!(variants.contains(&"reg".to_string()));
        assert!(variants.contains(&"registration".to_string()));
    }

    #[test]
    fn fuzzy_search_finds_synonym_not_matched_by_literal_term() {
        let store = CsvLogStore::from_rows(vec![row("reg failed for CM"), row("unrelated entry")]);
        let rowset = RowSet::full(2);

        let literal = store.search_substring(&rowset, "registration", &[]).unwrap();
        assert!(literal.is_empty());

        let fuzzy = fuzzy_search(&store, &rowset, "registration").unwrap();
        assert_eq!(fuzzy.len(), 1);
    }

    #[test]
    fn fuzzy_search_superset_of_literal_search() {
        let store = CsvLogStore::from_rows(vec![row("error occurred"), row("err in module")]);
        let rowset = RowSet::full(2);

        let literal = store.search_substring(&rowset, "error", &[]).unwrap();
        let fuzzy = fuzzy_search(&store, &rowset, "error").unwrap();
        assert!(fuzzy.len() >= literal.len());
        for idx in literal.iter() {
            assert!(fuzzy.contains(idx));
        }
    }
}
