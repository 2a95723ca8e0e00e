//! `verify` command

use super::multiply::operand_ids;
use crate::io::{read_matrix, read_results, MatrixFormat};
use crate::mapreduce::Operand;
use crate::matrix::Shape;
use crate::verify::{compare, reference_for_operands};
use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct VerifyParams {
    pub a: PathBuf,
    pub b: PathBuf,
    pub c: PathBuf,
    pub format: MatrixFormat,
    pub shape_a: Option<Shape>,
    pub shape_b: Option<Shape>,
    pub tolerance: f64,
}

/// Execute the verify command
pub async fn run_verify(params: VerifyParams) -> Result<()> {
    let (id_a, id_b) = operand_ids(&params.a, &params.b);
    let a = Operand::new(id_a, read_matrix(&params.a, params.format, params.shape_a).await?);
    let b = Operand::new(id_b, read_matrix(&params.b, params.format, params.shape_b).await?);

    let expected = reference_for_operands(&a, &b)?;
    let actual = read_results(&params.c).await?;
    debug!("Comparing {} result cells with reference product", actual.len());

    let report = compare(&expected, &actual, params.tolerance);
    println!(
        "Frobenius norm of difference: {}\nMax absolute error: {}\nCells outside tolerance: {}\nMissing cells (read as zero): {}\nUnexpected cells: {}",
        report.frobenius_norm,
        report.max_abs_error,
        report.mismatched,
        report.missing,
        report.unexpected
    );

    report.into_result()?;
    println!("OK: result matches within tolerance {}", params.tolerance);
    Ok(())
}
