//! Random test matrices

use crate::error::{ErrorCode, MapmulError, Result};
use crate::matrix::{DenseMatrix, Shape};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default value range, half-open
pub const DEFAULT_LOW: i64 = -10;
pub const DEFAULT_HIGH: i64 = 10;

/// Random number generator, reproducible when a seed is given
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Dense matrix of integers drawn uniformly from `low..high`
pub fn random_integer_matrix<R: Rng>(
    shape: Shape,
    low: i64,
    high: i64,
    rng: &mut R,
) -> Result<DenseMatrix> {
    if low >= high {
        return Err(MapmulError::validation(
            ErrorCode::VALIDATION_GENERIC,
            format!("empty value range {}..{}", low, high),
        ));
    }

    let data = (0..shape.cells())
        .map(|_| rng.random_range(low..high) as f64)
        .collect();
    DenseMatrix::from_vec(shape, data)
}

/// A compatible pair of operands `(rows x shared, shared x cols)`
pub fn random_operands<R: Rng>(
    rows: usize,
    shared: usize,
    cols: usize,
    low: i64,
    high: i64,
    rng: &mut R,
) -> Result<(DenseMatrix, DenseMatrix)> {
    let a = random_integer_matrix(Shape::new(rows, shared), low, high, rng)?;
    let b = random_integer_matrix(Shape::new(shared, cols), low, high, rng)?;
    Ok((a, b))
}
