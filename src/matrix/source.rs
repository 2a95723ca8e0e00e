//! The input seam of the pipeline
//!
//! A [`MatrixSource`] knows its shape up front and can replay its stored entries
//! for any row range as often as asked. Replaying is what lets a failed map task
//! be rerun without coordination.

use super::{Scalar, Shape};
use crate::error::Result;
use std::ops::Range;

/// Stored entries of a matrix as `(row, col, value)` triples
pub type Entries<'a> = Box<dyn Iterator<Item = (usize, usize, Scalar)> + Send + 'a>;

/// A matrix that can be read as a stream of entries
///
/// Entries may come in any order but no coordinate may be repeated. Zero
/// values may be omitted.
pub trait MatrixSource: Send + Sync {
    /// Dimensions of the matrix, known before any entry is read
    fn shape(&self) -> Shape;

    /// Entries whose row lies in `rows`
    fn entries(&self, rows: Range<usize>) -> Result<Entries<'_>>;

    /// Number of nonzero values, when cheaply known
    fn nonzeros(&self) -> Option<usize> {
        None
    }
}
