//! Log Store adapter (§4.1): a thin, trait-bounded facade over the row
//! backing data. The crate ships one concrete implementation, `CsvLogStore`,
//! so the engine is runnable end to end, but the core only ever depends on
//! the `LogStore` trait.

mod csv_store;
mod row;
mod rowset;

pub use csv_store::CsvLogStore;
pub use row::{Row, Severity};
pub use rowset::RowSet;

use crate::error::EngineResult;

/// Deterministic primitives over rows (§4.1). Implementations must preserve
/// original row ordering in every filter and must never mutate the inputs
/// they are given.
#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    /// Returns the full ingested dataset. Called at most once per query by
    /// the orchestrator; the result is cached as `loaded_rows`.
    async fn load(&self) -> EngineResult<RowSet>;

    /// Case-sensitive literal substring search. If `columns` is empty,
    /// matches against a concatenation of all columns' string forms.
    /// An empty `needle` is an error.
    fn search_substring(
        &self,
        rowset: &RowSet,
        needle: &str,
        columns: &[String],
    ) -> EngineResult<RowSet>;

    /// Retains rows whose timestamp is `>= start` and `<= end` by
    /// lexicographic comparison of ISO-8601 strings. Rows with unparseable
    /// timestamps are excluded. Both bounds missing is an error.
    fn filter_time(
        &self,
        rowset: &RowSet,
        start: Option<&str>,
        end: Option<&str>,
    ) -> EngineResult<RowSet>;

    /// Retains rows whose severity is in `severities`. Empty set is an error.
    fn filter_severity(&self, rowset: &RowSet, severities: &[Severity]) -> EngineResult<RowSet>;

    /// Exact-equality match on a named field. Missing field excludes the row.
    fn filter_field(&self, rowset: &RowSet, field: &str, value: &str) -> EngineResult<RowSet>;

    /// Number of rows in the set.
    fn count(&self, rowset: &RowSet) -> usize;

    /// Resolve a row index back to a `Row` reference for display/formatting.
    fn row(&self, index: usize) -> Option<&Row>;
}
