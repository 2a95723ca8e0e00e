//! Element emission
//!
//! Turns a matrix source into a lazy stream of [`MatrixElement`]s for one input
//! split. Calling [`ElementEmitter::emit`] again for the same split replays the
//! same elements, which is what makes a map task safe to rerun.

use crate::error::{ErrorCode, MapmulError, Result};
use crate::matrix::{MatrixElement, MatrixHandle, MatrixId, MatrixSource, Scalar};
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::ops::Range;

/// Which coordinates of a matrix are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DensityPolicy {
    /// Every coordinate, absent entries emitted as explicit zeros
    Dense,
    /// Only nonzero values
    SkipZeros,
}

/// A contiguous row range of one operand, processed by one map task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSplit {
    pub id: usize,
    pub matrix: MatrixId,
    pub rows: Range<usize>,
}

/// Divide every operand into splits of at most `split_rows` rows
///
/// Pure planning function; split ids are dense and start at zero.
pub fn plan_splits(handles: &[&MatrixHandle], split_rows: usize) -> Vec<InputSplit> {
    let split_rows = split_rows.max(1);
    let mut splits = Vec::new();

    for handle in handles {
        let mut start = 0;
        while start < handle.rows {
            let end = (start + split_rows).min(handle.rows);
            splits.push(InputSplit {
                id: splits.len(),
                matrix: handle.id.clone(),
                rows: start..end,
            });
            start = end;
        }
    }

    splits
}

/// Produces the elements of a matrix source under a density policy
#[derive(Debug, Clone, Copy)]
pub struct ElementEmitter {
    policy: DensityPolicy,
}

impl ElementEmitter {
    pub fn new(policy: DensityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DensityPolicy {
        self.policy
    }

    /// Emit the elements of `rows` for the matrix behind `handle`
    ///
    /// Sources may yield a split's entries in any order. They are collected and
    /// sorted row-major first; an entry outside the split or a repeated
    /// coordinate fails the split instead of being dropped.
    pub fn emit(
        &self,
        source: &dyn MatrixSource,
        handle: &MatrixHandle,
        rows: Range<usize>,
    ) -> Result<Elements> {
        let rows = rows.start.min(handle.rows)..rows.end.min(handle.rows);
        let entries = collect_split(source, handle, &rows)?;

        let inner = match self.policy {
            DensityPolicy::SkipZeros => Inner::Stored(entries.into_iter()),
            DensityPolicy::Dense => Inner::Filled {
                entries: entries.into_iter().peekable(),
                row: rows.start,
                col: 0,
                end_row: rows.end,
                cols: handle.cols,
            },
        };

        Ok(Elements {
            matrix_id: handle.id.clone(),
            inner,
        })
    }
}

/// Read one split's entries, checked and sorted row-major
fn collect_split(
    source: &dyn MatrixSource,
    handle: &MatrixHandle,
    rows: &Range<usize>,
) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = source.entries(rows.clone())?.collect();

    if let Some(&(row, col, _)) = entries
        .iter()
        .find(|(r, c, _)| !rows.contains(r) || *c >= handle.cols)
    {
        return Err(MapmulError::validation(
            ErrorCode::VALIDATION_OUT_OF_BOUNDS,
            format!(
                "{} yielded entry ({}, {}) outside rows {}..{} of a {} matrix",
                handle.id,
                row,
                col,
                rows.start,
                rows.end,
                handle.shape()
            ),
        ));
    }

    entries.sort_by_key(|&(r, c, _)| (r, c));
    if let Some(pair) = entries
        .windows(2)
        .find(|w| (w[0].0, w[0].1) == (w[1].0, w[1].1))
    {
        return Err(MapmulError::validation(
            ErrorCode::VALIDATION_DUPLICATE_ENTRY,
            format!(
                "{} yielded entry ({}, {}) more than once",
                handle.id, pair[0].0, pair[0].1
            ),
        ));
    }

    Ok(entries)
}

type Entry = (usize, usize, Scalar);

enum Inner {
    Stored(std::vec::IntoIter<Entry>),
    Filled {
        entries: Peekable<std::vec::IntoIter<Entry>>,
        row: usize,
        col: usize,
        end_row: usize,
        cols: usize,
    },
}

/// Stream of elements for one split
pub struct Elements {
    matrix_id: MatrixId,
    inner: Inner,
}

impl Iterator for Elements {
    type Item = MatrixElement;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col, value) = match &mut self.inner {
            Inner::Stored(entries) => entries.find(|(_, _, v)| *v != 0.0)?,
            Inner::Filled {
                entries,
                row,
                col,
                end_row,
                cols,
            } => {
                if *row >= *end_row || *cols == 0 {
                    return None;
                }
                let (r, c) = (*row, *col);
                *col += 1;
                if *col == *cols {
                    *col = 0;
                    *row += 1;
                }
                // Entries are sorted and bounds-checked, so each one is consumed
                let value = match entries.peek() {
                    Some(&(er, ec, v)) if er == r && ec == c => {
                        entries.next();
                        v
                    }
                    _ => 0.0,
                };
                (r, c, value)
            }
        };

        Some(MatrixElement {
            matrix_id: self.matrix_id.clone(),
            row,
            col,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::source::Entries;
    use crate::matrix::{DenseMatrix, Shape, SparseMatrix};

    fn handle(id: &str, shape: Shape) -> MatrixHandle {
        MatrixHandle::new(MatrixId::new(id), shape)
    }

    #[test]
    fn test_plan_splits() {
        let a = handle("A", Shape::new(5, 2));
        let b = handle("B", Shape::new(2, 3));
        let splits = plan_splits(&[&a, &b], 2);

        let ranges: Vec<_> = splits
            .iter()
            .map(|s| (s.matrix.as_str().to_string(), s.rows.clone()))
            .collect();
        assert_eq!(
            ranges,
            vec![
                ("A".to_string(), 0..2),
                ("A".to_string(), 2..4),
                ("A".to_string(), 4..5),
                ("B".to_string(), 0..2),
            ]
        );
        assert!(splits.iter().enumerate().all(|(i, s)| s.id == i));
    }

    #[test]
    fn test_plan_splits_edge_cases() {
        let empty = handle("E", Shape::new(0, 4));
        assert!(plan_splits(&[&empty], 3).is_empty());

        // Zero split size is treated as one row per split
        let a = handle("A", Shape::new(3, 1));
        assert_eq!(plan_splits(&[&a], 0).len(), 3);
    }

    #[test]
    fn test_dense_policy_fills_missing_entries() {
        let m = SparseMatrix::new(Shape::new(2, 2), vec![(0, 1, 2.0), (1, 0, 3.0)]).unwrap();
        let h = handle("S", Shape::new(2, 2));
        let emitter = ElementEmitter::new(DensityPolicy::Dense);

        let values: Vec<_> = emitter
            .emit(&m, &h, 0..2)
            .unwrap()
            .map(|e| (e.row, e.col, e.value))
            .collect();
        assert_eq!(
            values,
            vec![(0, 0, 0.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 0.0)]
        );
    }

    #[test]
    fn test_skip_zeros_policy() {
        let m = DenseMatrix::from_rows(&[[0.0, 1.0], [2.0, 0.0]]).unwrap();
        let h = handle("D", Shape::new(2, 2));
        let emitter = ElementEmitter::new(DensityPolicy::SkipZeros);

        let elements: Vec<_> = emitter.emit(&m, &h, 0..2).unwrap().collect();
        assert_eq!(elements.len(), 2);
        assert!(elements.iter().all(|e| e.value != 0.0));
        assert!(elements.iter().all(|e| e.matrix_id.as_str() == "D"));
    }

    /// Yields a dense matrix column by column
    struct ColumnMajor(DenseMatrix);

    impl MatrixSource for ColumnMajor {
        fn shape(&self) -> Shape {
            self.0.shape()
        }

        fn entries(&self, rows: Range<usize>) -> Result<Entries<'_>> {
            let cols = self.0.shape().cols;
            Ok(Box::new((0..cols).flat_map(move |col| {
                rows.clone().map(move |row| (row, col, self.0.get(row, col)))
            })))
        }
    }

    #[test]
    fn test_dense_policy_accepts_unordered_entries() {
        let m = ColumnMajor(DenseMatrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap());
        let h = handle("C", Shape::new(2, 2));

        for policy in [DensityPolicy::Dense, DensityPolicy::SkipZeros] {
            let values: Vec<_> = ElementEmitter::new(policy)
                .emit(&m, &h, 0..2)
                .unwrap()
                .map(|e| (e.row, e.col, e.value))
                .collect();
            assert_eq!(
                values,
                vec![(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0)]
            );
        }
    }

    /// Replays a fixed list of entries for any row range
    struct Raw(Shape, Vec<(usize, usize, Scalar)>);

    impl MatrixSource for Raw {
        fn shape(&self) -> Shape {
            self.0
        }

        fn entries(&self, _rows: Range<usize>) -> Result<Entries<'_>> {
            Ok(Box::new(self.1.iter().copied()))
        }
    }

    #[test]
    fn test_bad_entries_fail_the_split() {
        let h = handle("R", Shape::new(2, 2));
        let emitter = ElementEmitter::new(DensityPolicy::Dense);

        let repeated = Raw(Shape::new(2, 2), vec![(0, 1, 1.0), (0, 0, 2.0), (0, 1, 3.0)]);
        let err = emitter.emit(&repeated, &h, 0..2).err().unwrap();
        assert_eq!(err.code(), ErrorCode::VALIDATION_DUPLICATE_ENTRY);

        let wide = Raw(Shape::new(2, 2), vec![(0, 2, 1.0)]);
        let err = emitter.emit(&wide, &h, 0..2).err().unwrap();
        assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_BOUNDS);

        // Rows outside the requested split are not silently dropped
        let stray = Raw(Shape::new(2, 2), vec![(1, 0, 1.0)]);
        let err = emitter.emit(&stray, &h, 0..1).err().unwrap();
        assert_eq!(err.code(), ErrorCode::VALIDATION_OUT_OF_BOUNDS);
    }

    #[test]
    fn test_emission_is_restartable() {
        let m = DenseMatrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let h = handle("D", Shape::new(2, 2));
        let emitter = ElementEmitter::new(DensityPolicy::Dense);

        let first: Vec<_> = emitter.emit(&m, &h, 1..2).unwrap().collect();
        let second: Vec<_> = emitter.emit(&m, &h, 1..2).unwrap().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
