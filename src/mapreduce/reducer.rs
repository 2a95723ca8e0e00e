//! Cell reduction
//!
//! A fan-out reducer receives every entry routed to one destination cell. It
//! sorts each side by pairing index and checks that both sides carry exactly
//! the indices `0..k` before forming the dot product. Pairing never depends on
//! arrival order, so a retried or reordered shuffle produces the same value.

use super::partition::{CellKey, PartialEntry};
use crate::error::{ErrorCode, MapmulError, Result};
use crate::matrix::{Scalar, Side};
use serde::{Deserialize, Serialize};

/// One value of the product
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultCell {
    pub row: usize,
    pub col: usize,
    pub value: Scalar,
}

impl ResultCell {
    pub fn new(row: usize, col: usize, value: Scalar) -> Self {
        Self { row, col, value }
    }
}

/// Dot product of the fan-out entries for one cell
pub fn reduce_cell<'a, I>(cell: CellKey, entries: I, shared: usize) -> Result<ResultCell>
where
    I: IntoIterator<Item = &'a PartialEntry>,
{
    let mut left: Vec<(usize, Scalar)> = Vec::with_capacity(shared);
    let mut right: Vec<(usize, Scalar)> = Vec::with_capacity(shared);

    for entry in entries {
        if entry.cell() != cell {
            return Err(MapmulError::join_integrity(
                ErrorCode::JOIN_MISROUTED_ENTRY,
                cell.row,
                cell.col,
                format!(
                    "received an entry for ({}, {})",
                    entry.dest_row, entry.dest_col
                ),
            ));
        }
        match entry.source {
            Side::Left => left.push((entry.pairing_index, entry.value)),
            Side::Right => right.push((entry.pairing_index, entry.value)),
        }
    }

    left.sort_by_key(|&(t, _)| t);
    right.sort_by_key(|&(t, _)| t);
    check_indices(cell, Side::Left, &left, shared)?;
    check_indices(cell, Side::Right, &right, shared)?;

    let value = left
        .iter()
        .zip(&right)
        .map(|(&(_, l), &(_, r))| l * r)
        .sum();

    Ok(ResultCell::new(cell.row, cell.col, value))
}

/// Verify that a sorted side holds exactly the indices `0..shared`
fn check_indices(
    cell: CellKey,
    side: Side,
    sorted: &[(usize, Scalar)],
    shared: usize,
) -> Result<()> {
    if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(MapmulError::join_integrity(
            ErrorCode::JOIN_DUPLICATE_INDEX,
            cell.row,
            cell.col,
            format!("{} index {} was received more than once", side, pair[0].0),
        ));
    }

    if let Some(&(t, _)) = sorted.last().filter(|(t, _)| *t >= shared) {
        return Err(MapmulError::join_integrity(
            ErrorCode::JOIN_INDEX_OUT_OF_RANGE,
            cell.row,
            cell.col,
            format!(
                "{} index {} exceeds shared dimension {}",
                side, t, shared
            ),
        ));
    }

    if sorted.len() != shared {
        // Sorted, unique and below `shared`: the first gap is where position and index disagree
        let missing = sorted
            .iter()
            .enumerate()
            .find(|(position, (t, _))| position != t)
            .map(|(position, _)| position)
            .unwrap_or(sorted.len());
        return Err(MapmulError::join_integrity(
            ErrorCode::JOIN_MISSING_INDEX,
            cell.row,
            cell.col,
            format!(
                "{} side has {} of {} entries, index {} is missing",
                side,
                sorted.len(),
                shared,
                missing
            ),
        ));
    }

    Ok(())
}

/// Sum of the partial products for one cell
pub fn sum_cell(cell: CellKey, partials: &[Scalar]) -> ResultCell {
    ResultCell::new(cell.row, cell.col, partials.iter().sum())
}
