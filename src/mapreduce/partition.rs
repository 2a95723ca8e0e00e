//! Partition/join strategies
//!
//! Every output cell `(i, j)` needs the left row `i` and the right column `j`
//! to meet under one key. Two interchangeable strategies get them there:
//!
//! - [`PartitionStrategy::FanOut`] replicates each element to every destination
//!   cell it could contribute to and tags it with its pairing index. The reducer
//!   sorts and pairs by that index.
//! - [`PartitionStrategy::SharedDimension`] keys both operands by the summed-over
//!   index `t`. A join reduction per `t` multiplies every left entry with every
//!   right entry and emits products keyed by destination cell, which a second
//!   reduction sums.
//!
//! Both need the locked [`OperandRoles`]: the fan-out degree and the join key
//! space depend on the other operand's shape.

use crate::error::Result;
use crate::matrix::{MatrixElement, Scalar, Side};
use crate::registry::OperandRoles;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Strategy requested by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    FanOut,
    SharedDimension,
    #[default]
    Auto,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fan-out" | "fanout" | "a" => Ok(StrategyKind::FanOut),
            "shared-dimension" | "join" | "b" => Ok(StrategyKind::SharedDimension),
            "auto" => Ok(StrategyKind::Auto),
            other => Err(format!(
                "unknown strategy '{}' (expected fan-out, shared-dimension or auto)",
                other
            )),
        }
    }
}

/// Strategy a job actually runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionStrategy {
    FanOut,
    SharedDimension,
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionStrategy::FanOut => write!(f, "fan-out"),
            PartitionStrategy::SharedDimension => write!(f, "shared-dimension"),
        }
    }
}

/// Counts used to pick a strategy at runtime
#[derive(Debug, Clone, Copy)]
pub struct CostInputs {
    pub left_rows: usize,
    pub shared: usize,
    pub right_cols: usize,
    /// Elements the left operand will emit under the join strategy
    pub left_emitted: usize,
    /// Elements the right operand will emit under the join strategy
    pub right_emitted: usize,
}

impl CostInputs {
    /// Records emitted by fan-out: every cell of both operands, replicated
    pub fn fan_out_records(&self) -> u128 {
        2 * self.left_rows as u128 * self.shared as u128 * self.right_cols as u128
    }

    /// Records emitted by the join: the keyed elements plus the expected products
    pub fn shared_dimension_records(&self) -> u128 {
        let left = self.left_emitted as u128;
        let right = self.right_emitted as u128;
        left + right + left * right / (self.shared.max(1) as u128)
    }
}

impl PartitionStrategy {
    /// Resolve the configured strategy; `Auto` picks the cheaper plan, ties go to the join
    pub fn select(kind: StrategyKind, costs: &CostInputs) -> Self {
        match kind {
            StrategyKind::FanOut => PartitionStrategy::FanOut,
            StrategyKind::SharedDimension => PartitionStrategy::SharedDimension,
            StrategyKind::Auto => {
                if costs.fan_out_records() < costs.shared_dimension_records() {
                    PartitionStrategy::FanOut
                } else {
                    PartitionStrategy::SharedDimension
                }
            }
        }
    }
}

/// Destination cell of the product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A fan-out value tagged with everything needed to pair it later
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialEntry {
    pub dest_row: usize,
    pub dest_col: usize,
    pub source: Side,
    pub pairing_index: usize,
    pub value: Scalar,
}

impl PartialEntry {
    pub fn cell(&self) -> CellKey {
        CellKey::new(self.dest_row, self.dest_col)
    }
}

/// Fan-out replicas of one element
pub struct FanOut {
    source: Side,
    fixed: usize,
    pairing_index: usize,
    value: Scalar,
    targets: Range<usize>,
}

impl Iterator for FanOut {
    type Item = PartialEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let target = self.targets.next()?;
        let (dest_row, dest_col) = match self.source {
            Side::Left => (self.fixed, target),
            Side::Right => (target, self.fixed),
        };
        Some(PartialEntry {
            dest_row,
            dest_col,
            source: self.source,
            pairing_index: self.pairing_index,
            value: self.value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.targets.size_hint()
    }
}

/// Replicate an element to every destination cell it contributes to
///
/// Left `(i, t, v)` goes to `(i, j)` for every right column `j`; right
/// `(t, j, v)` goes to `(i, j)` for every left row `i`. Both carry `t`.
pub fn fan_out(element: &MatrixElement, roles: &OperandRoles) -> Result<FanOut> {
    let source = roles.side_of(&element.matrix_id)?;
    let fan_out = match source {
        Side::Left => FanOut {
            source,
            fixed: element.row,
            pairing_index: element.col,
            value: element.value,
            targets: 0..roles.right().cols,
        },
        Side::Right => FanOut {
            source,
            fixed: element.col,
            pairing_index: element.row,
            value: element.value,
            targets: 0..roles.left().rows,
        },
    };
    Ok(fan_out)
}

/// A join value keyed by its shared index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinEntry {
    pub side: Side,
    /// Left row `i` or right column `j`
    pub outer_index: usize,
    pub value: Scalar,
}

/// An already-multiplied contribution to one destination cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialProduct {
    pub cell: CellKey,
    pub value: Scalar,
}

/// Key an element by the shared dimension
///
/// Left `(i, t, v)` becomes `t -> (Left, i, v)`; right `(t, j, v)` becomes
/// `t -> (Right, j, v)`.
pub fn key_by_shared_dimension(
    element: &MatrixElement,
    roles: &OperandRoles,
) -> Result<(usize, JoinEntry)> {
    let side = roles.side_of(&element.matrix_id)?;
    let keyed = match side {
        Side::Left => (
            element.col,
            JoinEntry {
                side,
                outer_index: element.row,
                value: element.value,
            },
        ),
        Side::Right => (
            element.row,
            JoinEntry {
                side,
                outer_index: element.col,
                value: element.value,
            },
        ),
    };
    Ok(keyed)
}

/// Cross product of every left and right entry sharing one index
pub fn join_cross_product(entries: &[JoinEntry]) -> impl Iterator<Item = PartialProduct> + '_ {
    let left = entries.iter().filter(|e| e.side == Side::Left);
    left.flat_map(move |l| {
        entries
            .iter()
            .filter(|e| e.side == Side::Right)
            .map(move |r| PartialProduct {
                cell: CellKey::new(l.outer_index, r.outer_index),
                value: l.value * r.value,
            })
    })
}
