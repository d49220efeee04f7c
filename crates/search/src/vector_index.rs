//! Exact nearest-neighbor index over dense vectors.
//!
//! Vectors are stored contiguously in insertion order and compared by
//! squared Euclidean distance. Search is brute force, so results are exact.

use minutes_core::{AppError, AppResult};

/// A search candidate: position in the index and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Flat (brute-force) L2 index.
///
/// The dimension is unset until the first vector arrives and is immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty, dimensionless index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the dimension already fixed.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        match self.dimension {
            Some(d) if d > 0 => self.data.len() / d,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fix the dimension on first use, or check it against the established one.
    pub fn ensure_dimension(&mut self, dimension: usize) -> AppResult<()> {
        if dimension == 0 {
            return Err(AppError::InvalidRequest(
                "Cannot index zero-length vectors".to_string(),
            ));
        }
        match self.dimension {
            Some(expected) if expected != dimension => Err(AppError::DimensionMismatch {
                expected,
                actual: dimension,
            }),
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(dimension);
                Ok(())
            }
        }
    }

    /// Append a vector; its length must match the index dimension.
    pub fn add(&mut self, vector: &[f32]) -> AppResult<()> {
        self.ensure_dimension(vector.len())?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Stored vector at a position.
    pub fn vector(&self, index: usize) -> Option<&[f32]> {
        let d = self.dimension?;
        let start = index.checked_mul(d)?;
        self.data.get(start..start + d)
    }

    /// Raw contiguous storage, row-major.
    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Drop vectors past `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        if let Some(d) = self.dimension {
            self.data.truncate(len * d);
        }
    }

    /// Build a fresh index of the same dimension holding only the given positions.
    pub fn rebuild(&self, keep: &[usize]) -> Self {
        let mut rebuilt = Self {
            dimension: self.dimension,
            data: Vec::with_capacity(keep.len() * self.dimension.unwrap_or(0)),
        };
        for &i in keep {
            if let Some(v) = self.vector(i) {
                rebuilt.data.extend_from_slice(v);
            }
        }
        rebuilt
    }

    /// The `k` nearest vectors by ascending squared Euclidean distance.
    ///
    /// `k` is clamped to the index size. Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                distance: squared_l2(query, v),
            })
            .collect();

        let by_distance = |a: &Neighbor, b: &Neighbor| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        };

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, by_distance);
            neighbors.truncate(k);
        }
        neighbors.sort_by(by_distance);

        Ok(neighbors)
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(vectors: &[&[f32]]) -> FlatIndex {
        let mut index = FlatIndex::new();
        for v in vectors {
            index.add(v).unwrap();
        }
        index
    }

    #[test]
    fn test_first_add_fixes_dimension() {
        let mut index = FlatIndex::new();
        assert_eq!(index.dimension(), None);

        index.add(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(index.dimension(), Some(3));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut index = index_of(&[&[1.0, 2.0, 3.0]]);

        let err = index.add(&[1.0, 2.0]).unwrap_err();
        match err {
            AppError::DimensionMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected DimensionMismatch, got {other:?}"),
        }
        // Nothing was appended
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = index_of(&[&[10.0, 0.0], &[1.0, 0.0], &[3.0, 0.0]]);

        let results = index.search(&[0.0, 0.0], 3).unwrap();
        let order: Vec<usize> = results.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(results[0].distance, 1.0);
        assert_eq!(results[1].distance, 9.0);
        assert_eq!(results[2].distance, 100.0);
    }

    #[test]
    fn test_search_clamps_k() {
        let index = index_of(&[&[1.0], &[2.0]]);
        assert_eq!(index.search(&[0.0], 10).unwrap().len(), 2);
        assert!(index.search(&[0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let index = index_of(&[&[1.0, 0.0], &[0.0, 1.0], &[-1.0, 0.0], &[0.0, -1.0]]);

        let results = index.search(&[0.0, 0.0], 2).unwrap();
        let order: Vec<usize> = results.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![0, 1]);

        let all = index.search(&[0.0, 0.0], 4).unwrap();
        let order: Vec<usize> = all.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatIndex::new();
        assert!(index.search(&[1.0, 2.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_checked() {
        let index = index_of(&[&[1.0, 2.0]]);
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(AppError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rebuild_keeps_selected_vectors() {
        let index = index_of(&[&[1.0, 1.0], &[2.0, 2.0], &[3.0, 3.0]]);

        let rebuilt = index.rebuild(&[0, 2]);
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt.dimension(), Some(2));
        assert_eq!(rebuilt.vector(0), Some(&[1.0, 1.0][..]));
        assert_eq!(rebuilt.vector(1), Some(&[3.0, 3.0][..]));
        assert_eq!(rebuilt.vector(2), None);
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }
}
