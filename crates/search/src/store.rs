//! Paired vector index and record store.
//!
//! `Store` is the only owner of the two parallel collections. Every mutation
//! goes through a paired operation, so `index.len() == records.len()` holds
//! after each call returns.

use crate::records::RecordStore;
use crate::types::{StoreStats, VectorMetadata};
use crate::vector_index::{FlatIndex, Neighbor};
use minutes_core::{AppError, AppResult};

/// Project key used in stats for records without a project.
pub const NO_PROJECT_KEY: &str = "none";

/// Vectors and their metadata, kept in lockstep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    index: FlatIndex,
    records: RecordStore,
}

/// Position in the store before a batch was appended, for rollback.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    len: usize,
    dimension: Option<usize>,
}

impl Store {
    /// Create an empty, dimensionless store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair an index with its records, checking that they line up.
    pub(crate) fn from_parts(index: FlatIndex, records: RecordStore) -> AppResult<Self> {
        if index.len() != records.len() {
            return Err(AppError::CorruptStore(format!(
                "{} vectors but {} metadata records",
                index.len(),
                records.len()
            )));
        }
        Ok(Self { index, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension()
    }

    pub fn record(&self, index: usize) -> Option<&VectorMetadata> {
        self.records.get(index)
    }

    pub fn vector(&self, index: usize) -> Option<&[f32]> {
        self.index.vector(index)
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub(crate) fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Append one vector with its metadata.
    pub fn add(&mut self, vector: &[f32], metadata: VectorMetadata) -> AppResult<()> {
        self.index.add(vector)?;
        self.records.append(metadata);
        Ok(())
    }

    /// Append a batch, all or nothing.
    ///
    /// Every vector is checked against the store dimension (or the first vector
    /// of the batch when the store is dimensionless) before anything is written.
    pub fn add_batch(&mut self, items: Vec<(Vec<f32>, VectorMetadata)>) -> AppResult<usize> {
        let Some(expected) = self
            .index
            .dimension()
            .or_else(|| items.first().map(|(v, _)| v.len()))
        else {
            return Ok(0);
        };

        if let Some((vector, _)) = items.iter().find(|(v, _)| v.len() != expected) {
            return Err(AppError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        self.index.ensure_dimension(expected)?;
        let count = items.len();
        for (vector, metadata) in items {
            self.add(&vector, metadata)?;
        }
        Ok(count)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            len: self.len(),
            dimension: self.dimension(),
        }
    }

    /// Undo everything appended since the checkpoint.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        match checkpoint.dimension {
            Some(_) => {
                self.index.truncate(checkpoint.len);
                self.records.truncate(checkpoint.len);
            }
            None => self.clear(),
        }
    }

    /// Remove every record matching the predicate and rebuild from the survivors.
    ///
    /// Survivors keep their stored vectors (nothing is re-embedded) and their
    /// relative order. When nothing survives the store returns to the
    /// dimensionless state. Returns the number of records removed.
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&VectorMetadata) -> bool,
    {
        let keep = self.records.filter_indices(|md| !predicate(md));
        let removed = self.len() - keep.len();

        if removed == 0 {
            return 0;
        }

        if keep.is_empty() {
            self.clear();
        } else {
            self.index = self.index.rebuild(&keep);
            self.records = self.records.rebuild(&keep);
        }

        debug_assert_eq!(self.index.len(), self.records.len());
        removed
    }

    /// Drop all vectors and records, including the dimension.
    pub fn clear(&mut self) {
        self.index = FlatIndex::new();
        self.records = RecordStore::new();
    }

    /// Nearest records to a query vector, distance ascending.
    pub fn nearest(&self, query: &[f32], k: usize) -> AppResult<Vec<(Neighbor, &VectorMetadata)>> {
        let neighbors = self.index.search(query, k)?;
        neighbors
            .into_iter()
            .map(|n| {
                self.records
                    .get(n.index)
                    .map(|md| (n, md))
                    .ok_or_else(|| {
                        AppError::CorruptStore(format!("No metadata for vector {}", n.index))
                    })
            })
            .collect()
    }

    /// Count of records for one meeting.
    pub fn count_for_meeting(&self, meeting_id: &str) -> usize {
        self.records
            .iter()
            .filter(|md| md.meeting_id == meeting_id)
            .count()
    }

    /// Count of records for one project.
    pub fn count_for_project(&self, project_id: &str) -> usize {
        self.records
            .iter()
            .filter(|md| md.project_id.as_deref() == Some(project_id))
            .count()
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_vectors: self.len(),
            embedding_dimension: self.dimension(),
            ..Default::default()
        };

        for md in self.records.iter() {
            *stats.meetings.entry(md.meeting_id.clone()).or_default() += 1;
            *stats.segment_types.entry(md.segment_type()).or_default() += 1;
            let project = md.project_id.as_deref().unwrap_or(NO_PROJECT_KEY);
            *stats.projects.entry(project.to_string()).or_default() += 1;
        }

        stats
    }
}
