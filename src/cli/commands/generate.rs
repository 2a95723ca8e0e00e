//! `generate` command

use crate::generate::{random_operands, seeded_rng};
use crate::io::{write_dense, write_results};
use crate::mapreduce::ResultCell;
use crate::matrix::MatrixSource;
use crate::verify::reference_product;
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub rows: usize,
    pub shared: usize,
    pub cols: usize,
    pub low: i64,
    pub high: i64,
    pub seed: Option<u64>,
    pub out_a: PathBuf,
    pub out_b: PathBuf,
    pub out_c: Option<PathBuf>,
}

/// Execute the generate command
pub async fn run_generate(params: GenerateParams) -> Result<()> {
    let mut rng = seeded_rng(params.seed);
    let (a, b) = random_operands(
        params.rows,
        params.shared,
        params.cols,
        params.low,
        params.high,
        &mut rng,
    )?;

    write_dense(&params.out_a, &a).await?;
    write_dense(&params.out_b, &b).await?;
    info!(
        "Wrote {} matrix to {} and {} matrix to {}",
        a.shape(),
        params.out_a.display(),
        b.shape(),
        params.out_b.display()
    );

    if let Some(path) = &params.out_c {
        let c = reference_product(&a, &b)?;
        let shape = c.shape();
        let cells: Vec<ResultCell> = (0..shape.rows)
            .flat_map(|row| (0..shape.cols).map(move |col| (row, col)))
            .map(|(row, col)| ResultCell::new(row, col, c.get(row, col)))
            .collect();
        write_results(path, &cells).await?;
        info!("Wrote reference product to {}", path.display());
    }

    Ok(())
}
