use super::source::{Entries, MatrixSource};
use super::{Scalar, Shape};
use crate::error::{ErrorCode, MapmulError, Result};
use std::ops::Range;

/// Coordinate-list matrix kept sorted in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    shape: Shape,
    entries: Vec<(usize, usize, Scalar)>,
}

impl SparseMatrix {
    /// Build from `(row, col, value)` triples inside an explicit shape
    pub fn new(shape: Shape, mut entries: Vec<(usize, usize, Scalar)>) -> Result<Self> {
        if let Some(&(row, col, _)) = entries.iter().find(|(r, c, _)| !shape.contains(*r, *c)) {
            return Err(MapmulError::validation(
                ErrorCode::VALIDATION_OUT_OF_BOUNDS,
                format!("entry ({}, {}) lies outside a {} matrix", row, col, shape),
            ));
        }

        entries.sort_by_key(|&(r, c, _)| (r, c));
        if let Some(pair) = entries
            .windows(2)
            .find(|w| (w[0].0, w[0].1) == (w[1].0, w[1].1))
        {
            return Err(MapmulError::validation(
                ErrorCode::VALIDATION_DUPLICATE_ENTRY,
                format!("entry ({}, {}) is given more than once", pair[0].0, pair[0].1),
            ));
        }

        Ok(Self { shape, entries })
    }

    /// Build from triples, inferring the shape as `(max(row) + 1, max(col) + 1)`
    pub fn from_triples(entries: Vec<(usize, usize, Scalar)>) -> Result<Self> {
        let mut shape = Shape::new(0, 0);
        for &(row, col, _) in &entries {
            let (Some(rows), Some(cols)) = (row.checked_add(1), col.checked_add(1)) else {
                return Err(MapmulError::validation(
                    ErrorCode::VALIDATION_OUT_OF_BOUNDS,
                    format!("entry ({}, {}) has no representable shape", row, col),
                ));
            };
            shape = Shape::new(shape.rows.max(rows), shape.cols.max(cols));
        }
        Self::new(shape, entries)
    }

    /// Number of stored entries, zeros included
    pub fn stored(&self) -> usize {
        self.entries.len()
    }

    pub fn triples(&self) -> &[(usize, usize, Scalar)] {
        &self.entries
    }
}

impl MatrixSource for SparseMatrix {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn entries(&self, rows: Range<usize>) -> Result<Entries<'_>> {
        let start = self.entries.partition_point(|e| e.0 < rows.start);
        let end = self.entries.partition_point(|e| e.0 < rows.end).max(start);
        Ok(Box::new(self.entries[start..end].iter().copied()))
    }

    fn nonzeros(&self) -> Option<usize> {
        Some(self.entries.iter().filter(|e| e.2 != 0.0).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infers_shape_from_max_coordinates() {
        let m = SparseMatrix::from_triples(vec![(0, 0, 1.0), (2, 1, 5.0)]).unwrap();
        assert_eq!(m.shape(), Shape::new(3, 2));
    }

    #[test]
    fn test_sorts_entries_row_major() {
        let m = SparseMatrix::new(
            Shape::new(2, 2),
            vec![(1, 1, 4.0), (0, 1, 2.0), (1, 0, 3.0)],
        )
        .unwrap();
        let entries: Vec<_> = m.entries(0..2).unwrap().collect();
        assert_eq!(entries, vec![(0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0)]);
    }

    #[test]
    fn test_entries_for_row_range() {
        let m = SparseMatrix::from_triples(vec![(0, 0, 1.0), (1, 0, 2.0), (3, 0, 4.0)]).unwrap();
        let entries: Vec<_> = m.entries(1..3).unwrap().collect();
        assert_eq!(entries, vec![(1, 0, 2.0)]);
    }

    #[test]
    fn test_rejects_duplicates_and_out_of_bounds() {
        let dup = SparseMatrix::from_triples(vec![(0, 0, 1.0), (0, 0, 2.0)]).unwrap_err();
        assert_eq!(dup.code(), ErrorCode::VALIDATION_DUPLICATE_ENTRY);

        let oob = SparseMatrix::new(Shape::new(1, 1), vec![(0, 1, 1.0)]).unwrap_err();
        assert_eq!(oob.code(), ErrorCode::VALIDATION_OUT_OF_BOUNDS);
    }

    #[test]
    fn test_rejects_coordinates_at_usize_max() {
        for entry in [(usize::MAX, 0, 1.0), (0, usize::MAX, 1.0)] {
            let err = SparseMatrix::from_triples(vec![(0, 0, 2.0), entry]).unwrap_err();
            assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_BOUNDS);
        }
    }

    #[test]
    fn test_nonzeros_ignores_stored_zeros() {
        let m = SparseMatrix::from_triples(vec![(0, 0, 0.0), (0, 1, 3.0)]).unwrap();
        assert_eq!(m.stored(), 2);
        assert_eq!(m.nonzeros(), Some(1));
    }
}
