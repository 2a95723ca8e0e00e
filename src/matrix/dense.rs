use super::source::{Entries, MatrixSource};
use super::{Scalar, Shape};
use crate::error::{ErrorCode, MapmulError, Result};
use std::ops::Range;

/// Row-major dense matrix held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    shape: Shape,
    data: Vec<Scalar>,
}

impl DenseMatrix {
    /// Matrix of the given shape filled with zeros
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.cells()],
        }
    }

    /// Build from row-major data; `data.len()` must equal `rows * cols`
    pub fn from_vec(shape: Shape, data: Vec<Scalar>) -> Result<Self> {
        if data.len() != shape.cells() {
            return Err(MapmulError::validation(
                ErrorCode::VALIDATION_INVALID_SHAPE,
                format!(
                    "{} values cannot fill a {} matrix",
                    data.len(),
                    shape
                ),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Build from nested rows; every row must have the same length
    pub fn from_rows<R: AsRef<[Scalar]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MapmulError::parse(
                    ErrorCode::VALIDATION_RAGGED_ROW,
                    format!("row {} has {} values, expected {}", index, row.len(), cols),
                    None,
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            shape: Shape::new(rows.len(), cols),
            data,
        })
    }

    /// Identity matrix of size `n`
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(Shape::new(n, n));
        for i in 0..n {
            matrix.set(i, i, 1.0);
        }
        matrix
    }

    /// Read every entry of another source into a dense matrix
    pub fn from_source(source: &dyn MatrixSource) -> Result<Self> {
        let shape = source.shape();
        let mut matrix = Self::zeros(shape);
        for (row, col, value) in source.entries(0..shape.rows)? {
            matrix.set(row, col, value);
        }
        Ok(matrix)
    }

    pub fn get(&self, row: usize, col: usize) -> Scalar {
        self.data[row * self.shape.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Scalar) {
        self.data[row * self.shape.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[Scalar] {
        let start = row * self.shape.cols;
        &self.data[start..start + self.shape.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Scalar]> {
        (0..self.shape.rows).map(move |r| self.row(r))
    }

    pub fn as_slice(&self) -> &[Scalar] {
        &self.data
    }

    pub fn transpose(&self) -> Self {
        let shape = Shape::new(self.shape.cols, self.shape.rows);
        let mut out = Self::zeros(shape);
        for r in 0..self.shape.rows {
            for c in 0..self.shape.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }
}

impl MatrixSource for DenseMatrix {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn entries(&self, rows: Range<usize>) -> Result<Entries<'_>> {
        let rows = rows.start.min(self.shape.rows)..rows.end.min(self.shape.rows);
        Ok(Box::new(rows.flat_map(move |r| {
            self.row(r)
                .iter()
                .enumerate()
                .map(move |(c, &value)| (r, c, value))
        })))
    }

    fn nonzeros(&self) -> Option<usize> {
        Some(self.data.iter().filter(|v| **v != 0.0).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_RAGGED_ROW);
    }

    #[test]
    fn test_entries_cover_row_range() {
        let m = DenseMatrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let entries: Vec<_> = m.entries(1..3).unwrap().collect();
        assert_eq!(
            entries,
            vec![(1, 0, 3.0), (1, 1, 4.0), (2, 0, 5.0), (2, 1, 6.0)]
        );
    }

    #[test]
    fn test_entries_clamp_to_shape() {
        let m = DenseMatrix::identity(2);
        assert_eq!(m.entries(1..10).unwrap().count(), 2);
        assert_eq!(m.entries(5..10).unwrap().count(), 0);
    }

    #[test]
    fn test_nonzeros_and_transpose() {
        let m = DenseMatrix::from_rows(&[[0.0, 2.0, 0.0], [1.0, 0.0, 0.0]]).unwrap();
        assert_eq!(m.nonzeros(), Some(2));

        let t = m.transpose();
        assert_eq!(t.shape(), Shape::new(3, 2));
        assert_eq!(t.get(1, 0), 2.0);
        assert_eq!(t.get(0, 1), 1.0);
    }
}
