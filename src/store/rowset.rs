//! `RowSet` (§3 Data Model, §4.1 expansion): an ordered, immutable,
//! cheaply-cloned view of a subset of rows.

use std::sync::Arc;

/// Indices into a shared backing `Vec<Row>`. Cloning a `RowSet` clones the
/// index list only, never row data, while still presenting independent,
/// immutable semantics — two row sets never share *mutable* state because
/// the backing store is never mutated after `load()`.
#[derive(Debug, Clone)]
pub struct RowSet {
    indices: Arc<[usize]>,
}

impl RowSet {
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices: Arc::from(indices),
        }
    }

    pub fn empty() -> Self {
        Self {
            indices: Arc::from(Vec::new()),
        }
    }

    pub fn full(len: usize) -> Self {
        Self::new((0..len).collect())
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }
}
