//! Per-worker partial aggregation
//!
//! Fan-out entries are only bundled per destination cell. Two entries with
//! the same pairing index must both reach the reducer so it can reject the
//! duplicate, so they are never summed here. Join products are summed per
//! cell, which only reorders a floating-point sum.

use super::partition::{CellKey, PartialEntry, PartialProduct};
use crate::matrix::Scalar;
use std::collections::BTreeMap;

/// Group fan-out entries by destination cell
pub fn bundle_by_cell<I>(entries: I) -> BTreeMap<CellKey, Vec<PartialEntry>>
where
    I: IntoIterator<Item = PartialEntry>,
{
    let mut bundles: BTreeMap<CellKey, Vec<PartialEntry>> = BTreeMap::new();
    for entry in entries {
        bundles.entry(entry.cell()).or_default().push(entry);
    }
    bundles
}

/// Sum join products by destination cell
pub fn sum_by_cell<I>(products: I) -> BTreeMap<CellKey, Scalar>
where
    I: IntoIterator<Item = PartialProduct>,
{
    let mut sums: BTreeMap<CellKey, Scalar> = BTreeMap::new();
    for product in products {
        *sums.entry(product.cell).or_insert(0.0) += product.value;
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Side;

    fn entry(row: usize, col: usize, source: Side, t: usize, value: Scalar) -> PartialEntry {
        PartialEntry {
            dest_row: row,
            dest_col: col,
            source,
            pairing_index: t,
            value,
        }
    }

    #[test]
    fn test_bundle_keeps_every_entry() {
        let bundles = bundle_by_cell(vec![
            entry(0, 0, Side::Left, 0, 1.0),
            entry(0, 1, Side::Left, 0, 1.0),
            entry(0, 0, Side::Right, 0, 2.0),
            // Same index twice: must survive bundling
            entry(0, 0, Side::Right, 0, 2.0),
        ]);

        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[&CellKey::new(0, 0)].len(), 3);
        assert_eq!(bundles[&CellKey::new(0, 1)].len(), 1);
    }

    #[test]
    fn test_sum_by_cell() {
        let product = |row, col, value| PartialProduct {
            cell: CellKey::new(row, col),
            value,
        };
        let sums = sum_by_cell(vec![
            product(1, 1, 2.0),
            product(0, 1, 5.0),
            product(1, 1, -3.0),
        ]);

        assert_eq!(sums[&CellKey::new(1, 1)], -1.0);
        assert_eq!(sums[&CellKey::new(0, 1)], 5.0);
        assert_eq!(sums.len(), 2);
    }
}
