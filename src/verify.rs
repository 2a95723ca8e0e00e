//! Result verification against a direct product
//!
//! The reference product is computed with a plain triple loop. A result
//! passes when every cell is within `tolerance * max(1, |expected|)` of the
//! reference and no cell falls outside the product or appears twice. Cells
//! absent from the result read as zero, which is how zero-skipping output is
//! meant to be consumed.

use crate::error::{ErrorCode, MapmulError, Result};
use crate::mapreduce::{Operand, ResultCell};
use crate::matrix::{DenseMatrix, MatrixId, MatrixSource, Scalar, Shape};
use crate::registry::ShapeRegistry;
use serde::{Deserialize, Serialize};

/// Default per-cell relative tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Direct product `left * right`
pub fn reference_product(left: &dyn MatrixSource, right: &dyn MatrixSource) -> Result<DenseMatrix> {
    let (ls, rs) = (left.shape(), right.shape());
    if ls.cols != rs.rows {
        return Err(MapmulError::shape_mismatch(
            MatrixId::new("left"),
            ls,
            MatrixId::new("right"),
            rs,
        ));
    }

    let a = DenseMatrix::from_source(left)?;
    let b = DenseMatrix::from_source(right)?;
    let mut c = DenseMatrix::zeros(Shape::new(ls.rows, rs.cols));
    for i in 0..ls.rows {
        for t in 0..ls.cols {
            let av = a.get(i, t);
            for j in 0..rs.cols {
                c.set(i, j, c.get(i, j) + av * b.get(t, j));
            }
        }
    }
    Ok(c)
}

/// Reference product for two operands given in any order
///
/// Roles are decided by the same rules a job uses.
pub fn reference_for_operands(first: &Operand, second: &Operand) -> Result<DenseMatrix> {
    let mut registry = ShapeRegistry::new();
    registry.register(first.id.clone(), first.source.shape())?;
    registry.register(second.id.clone(), second.source.shape())?;
    let roles = registry.roles()?;

    if roles.left().id == first.id {
        reference_product(first.source.as_ref(), second.source.as_ref())
    } else {
        reference_product(second.source.as_ref(), first.source.as_ref())
    }
}

/// Outcome of comparing a result with the reference product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub shape: Shape,
    pub tolerance: f64,
    /// Frobenius norm of `actual - expected`
    pub frobenius_norm: f64,
    pub max_abs_error: f64,
    /// Cells outside the tolerance
    pub mismatched: usize,
    /// Cells absent from the result, read as zero
    pub missing: usize,
    /// Cells outside the product shape or given more than once
    pub unexpected: usize,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.mismatched == 0 && self.unexpected == 0
    }

    /// Turn a failed report into an error
    pub fn into_result(self) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(MapmulError::validation(
                ErrorCode::VERIFICATION_MISMATCH,
                format!(
                    "{} cells differ and {} are unexpected (max error {}, Frobenius norm {})",
                    self.mismatched, self.unexpected, self.max_abs_error, self.frobenius_norm
                ),
            ))
        }
    }
}

fn within_tolerance(actual: Scalar, expected: Scalar, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance * expected.abs().max(1.0)
}

/// Compare result cells with the expected product
pub fn compare(expected: &DenseMatrix, actual: &[ResultCell], tolerance: f64) -> VerificationReport {
    let shape = expected.shape();
    let mut values: Vec<Option<Scalar>> = vec![None; shape.cells()];
    let mut unexpected = 0;

    for cell in actual {
        if !shape.contains(cell.row, cell.col) {
            unexpected += 1;
            continue;
        }
        let slot = &mut values[cell.row * shape.cols + cell.col];
        if slot.is_some() {
            unexpected += 1;
        } else {
            *slot = Some(cell.value);
        }
    }

    let mut squared = 0.0;
    let mut max_abs_error: f64 = 0.0;
    let mut mismatched = 0;
    let mut missing = 0;

    for (slot, value) in values.iter().enumerate() {
        let expected_value = expected.as_slice()[slot];
        let actual_value = value.unwrap_or_else(|| {
            missing += 1;
            0.0
        });

        let diff = actual_value - expected_value;
        squared += diff * diff;
        max_abs_error = max_abs_error.max(diff.abs());
        if !within_tolerance(actual_value, expected_value, tolerance) {
            mismatched += 1;
        }
    }

    VerificationReport {
        shape,
        tolerance,
        frobenius_norm: squared.sqrt(),
        max_abs_error,
        mismatched,
        missing,
        unexpected,
    }
}
