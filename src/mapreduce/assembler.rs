//! Output assembly
//!
//! Reducer results stream through an [`OutputAssembler`] into a [`ResultSink`].
//! The assembler applies the emission policy: with `skip_zeros` off every cell
//! of the product reaches the sink, and cells no reducer produced are filled
//! with zero; with `skip_zeros` on, cells whose value is exactly zero are
//! dropped.

use super::reducer::ResultCell;
use crate::error::{ErrorCode, MapmulError, Result};
use crate::matrix::{DenseMatrix, Shape};
use fnv::FnvHashSet;

/// Consumer of result cells
pub trait ResultSink {
    fn accept(&mut self, cell: ResultCell) -> Result<()>;
}

impl ResultSink for Vec<ResultCell> {
    fn accept(&mut self, cell: ResultCell) -> Result<()> {
        self.push(cell);
        Ok(())
    }
}

impl ResultSink for DenseMatrix {
    fn accept(&mut self, cell: ResultCell) -> Result<()> {
        let shape = crate::matrix::MatrixSource::shape(self);
        if !shape.contains(cell.row, cell.col) {
            return Err(MapmulError::validation(
                ErrorCode::VALIDATION_OUT_OF_BOUNDS,
                format!(
                    "result cell ({}, {}) lies outside a {} matrix",
                    cell.row, cell.col, shape
                ),
            ));
        }
        self.set(cell.row, cell.col, cell.value);
        Ok(())
    }
}

/// Cells already reduced
///
/// Zero filling needs a full bitmap; with zeros skipped only the reduced
/// cells are remembered, so a large sparse product costs no `rows * cols`
/// allocation.
#[derive(Debug)]
enum Seen {
    Bitmap(Vec<bool>),
    Cells(FnvHashSet<(usize, usize)>),
}

impl Seen {
    /// Mark a cell, returning false if it was already marked
    fn insert(&mut self, shape: Shape, row: usize, col: usize) -> bool {
        match self {
            Seen::Bitmap(bits) => {
                let slot = row * shape.cols + col;
                !std::mem::replace(&mut bits[slot], true)
            }
            Seen::Cells(cells) => cells.insert((row, col)),
        }
    }
}

/// Applies the emission policy to a stream of result cells
#[derive(Debug)]
pub struct OutputAssembler {
    shape: Shape,
    skip_zeros: bool,
    seen: Seen,
    emitted: usize,
}

impl OutputAssembler {
    pub fn new(shape: Shape, skip_zeros: bool) -> Self {
        let seen = if skip_zeros {
            Seen::Cells(FnvHashSet::default())
        } else {
            Seen::Bitmap(vec![false; shape.cells()])
        };
        Self {
            shape,
            skip_zeros,
            seen,
            emitted: 0,
        }
    }

    /// Forward one reducer result to the sink
    pub fn accept<S: ResultSink + ?Sized>(&mut self, cell: ResultCell, sink: &mut S) -> Result<()> {
        if !self.shape.contains(cell.row, cell.col) {
            return Err(MapmulError::validation(
                ErrorCode::VALIDATION_OUT_OF_BOUNDS,
                format!(
                    "result cell ({}, {}) lies outside the {} product",
                    cell.row, cell.col, self.shape
                ),
            ));
        }

        if !self.seen.insert(self.shape, cell.row, cell.col) {
            return Err(MapmulError::join_integrity(
                ErrorCode::JOIN_GENERIC,
                cell.row,
                cell.col,
                "cell was reduced more than once",
            ));
        }

        if self.skip_zeros && cell.value == 0.0 {
            return Ok(());
        }
        self.emitted += 1;
        sink.accept(cell)
    }

    /// Emit zeros for cells no reducer produced; returns the number of cells emitted
    pub fn finish<S: ResultSink + ?Sized>(self, sink: &mut S) -> Result<usize> {
        let mut emitted = self.emitted;
        if let Seen::Bitmap(bits) = &self.seen {
            let cols = self.shape.cols;
            for (slot, _) in bits.iter().enumerate().filter(|(_, seen)| !**seen) {
                sink.accept(ResultCell::new(slot / cols, slot % cols, 0.0))?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }
}
