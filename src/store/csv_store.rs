//! `CsvLogStore`: the concrete, in-memory `LogStore` implementation (§4.1
//! expansion). Reads the whole CSV into `Vec<Row>` once, at construction
//! time, via the `csv` crate.

use std::collections::HashMap;
use std::path::Path;

use crate::error::EngineResult;
use crate::logging::{log_debug, log_info};

use super::row::{Row, Severity};
use super::rowset::RowSet;
use super::LogStore;

/// An in-memory log store backed by a single CSV file.
///
/// The CSV's header row names the columns; every row must at minimum be
/// addressable by `_source.log` for entity extraction to find anything, but
/// a row missing that column is still ingested (it simply contributes no
/// entities and no parsed payload).
pub struct CsvLogStore {
    rows: Vec<Row>,
}

impl CsvLogStore {
    /// Read and parse `path` eagerly. A malformed CSV (unreadable file,
    /// header/row arity mismatch) is a `config_invalid` error — the store
    /// never partially loads.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path).map_err(|err| {
            crate::error::EngineError::config_invalid(format!(
                "could not open CSV dataset at {}: {err}",
                path.display()
            ))
        })?;

        let headers = reader
            .headers()
            .map_err(|err| {
                crate::error::EngineError::config_invalid(format!(
                    "could not read CSV headers from {}: {err}",
                    path.display()
                ))
            })?
            .clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| {
                crate::error::EngineError::config_invalid(format!(
                    "malformed CSV row in {}: {err}",
                    path.display()
                ))
            })?;
            let mut fields = HashMap::with_capacity(headers.len());
            for (name, value) in headers.iter().zip(record.iter()) {
                fields.insert(name.to_string(), value.to_string());
            }
            rows.push(Row::from_fields(fields));
        }

        log_info!(
            path = %path.display(),
            row_count = rows.len(),
            "loaded CSV log dataset"
        );

        Ok(Self { rows })
    }

    /// Build a store directly from already-parsed rows — used by tests and
    /// by any future alternate ingestion path.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

#[async_trait::async_trait]
impl LogStore for CsvLogStore {
    async fn load(&self) -> EngineResult<RowSet> {
        log_debug!(row_count = self.rows.len(), "loaded full dataset view");
        Ok(RowSet::full(self.rows.len()))
    }

    fn search_substring(
        &self,
        rowset: &RowSet,
        needle: &str,
        columns: &[String],
    ) -> EngineResult<RowSet> {
        if needle.is_empty() {
            return Err(crate::error::EngineError::invalid_parameter(
                "search_logs",
                "value",
                "search value must not be empty",
            ));
        }

        let kept = rowset
            .iter()
            .filter(|&idx| {
                let Some(row) = self.rows.get(idx) else {
                    return false;
                };
                if columns.is_empty() {
                    row.searchable_text().contains(needle)
                } else {
                    columns
                        .iter()
                        .any(|col| row.field(col).is_some_and(|v| v.contains(needle)))
                }
            })
            .collect::<Vec<_>>();

        Ok(RowSet::new(kept))
    }

    fn filter_time(
        &self,
        rowset: &RowSet,
        start: Option<&str>,
        end: Option<&str>,
    ) -> EngineResult<RowSet> {
        if start.is_none() && end.is_none() {
            return Err(crate::error::EngineError::invalid_parameter(
                "filter_by_time",
                "start/end",
                "at least one of start or end must be provided",
            ));
        }

        let kept = rowset
            .iter()
            .filter(|&idx| {
                let Some(row) = self.rows.get(idx) else {
                    return false;
                };
                let Some(ts) = row.timestamp.as_deref() else {
                    return false;
                };
                if chrono::DateTime::parse_from_rfc3339(ts).is_err() {
                    return false;
                }
                let after_start = start.map_or(true, |s| ts >= s);
                let before_end = end.map_or(true, |e| ts <= e);
                after_start && before_end
            })
            .collect::<Vec<_>>();

        Ok(RowSet::new(kept))
    }

    fn filter_severity(&self, rowset: &RowSet, severities: &[Severity]) -> EngineResult<RowSet> {
        if severities.is_empty() {
            return Err(crate::error::EngineError::invalid_parameter(
                "filter_by_severity",
                "severities",
                "severities list must not be empty",
            ));
        }

        let kept = rowset
            .iter()
            .filter(|&idx| {
                self.rows
                    .get(idx)
                    .and_then(|row| row.severity)
                    .is_some_and(|sev| severities.contains(&sev))
            })
            .collect::<Vec<_>>();

        Ok(RowSet::new(kept))
    }

    fn filter_field(&self, rowset: &RowSet, field: &str, value: &str) -> EngineResult<RowSet> {
        let kept = rowset
            .iter()
            .filter(|&idx| {
                self.rows
                    .get(idx)
                    .and_then(|row| row.field(field))
                    .is_some_and(|v| v == value)
            })
            .collect::<Vec<_>>();

        Ok(RowSet::new(kept))
    }

    fn count(&self, rowset: &RowSet) -> usize {
        rowset.len()
    }

    fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }
}
