//! Position-indexed metadata records, parallel to the vector index.

use crate::types::VectorMetadata;

/// Append-only list of record metadata.
///
/// Position `i` describes vector `i` of the companion index. Records are never
/// edited in place; removal happens by rebuilding from a list of kept positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<VectorMetadata>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<VectorMetadata>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn append(&mut self, metadata: VectorMetadata) {
        self.records.push(metadata);
    }

    pub fn get(&self, index: usize) -> Option<&VectorMetadata> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VectorMetadata> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[VectorMetadata] {
        &self.records
    }

    /// Positions of all records matching the predicate, ascending.
    pub fn filter_indices<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&VectorMetadata) -> bool,
    {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, md)| predicate(md))
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    /// A new store holding only the given positions, in the given order.
    pub(crate) fn rebuild(&self, keep: &[usize]) -> Self {
        Self {
            records: keep
                .iter()
                .filter_map(|&i| self.records.get(i).cloned())
                .collect(),
        }
    }
}
