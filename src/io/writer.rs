use crate::error::{MapmulError, Result};
use crate::mapreduce::{ResultCell, ResultSink};
use crate::matrix::{DenseMatrix, MatrixSource};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// One result line: `row, col, value`
pub fn format_cell(cell: &ResultCell) -> String {
    format!("{}, {}, {}", cell.row, cell.col, cell.value)
}

/// Streams result cells as text lines into any writer
pub struct TripleWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> TripleWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the writer
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> ResultSink for TripleWriter<W> {
    fn accept(&mut self, cell: ResultCell) -> Result<()> {
        writeln!(self.out, "{}", format_cell(&cell))?;
        self.written += 1;
        Ok(())
    }
}

/// Render result cells as text, one line per cell
pub fn render_results(cells: &[ResultCell]) -> String {
    let mut text = String::new();
    for cell in cells {
        // Writing into a String cannot fail
        let _ = writeln!(text, "{}", format_cell(cell));
    }
    text
}

/// Render a dense matrix as whitespace-separated rows
pub fn render_dense(matrix: &DenseMatrix) -> String {
    let mut text = String::new();
    for row in matrix.rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(text, "{}", line.join(" "));
    }
    text
}

/// Render the nonzero entries of any source as `row col value` lines
pub fn render_sparse(source: &dyn MatrixSource) -> Result<String> {
    let mut text = String::new();
    for (row, col, value) in source.entries(0..source.shape().rows)? {
        if value != 0.0 {
            let _ = writeln!(text, "{} {} {}", row, col, value);
        }
    }
    Ok(text)
}

async fn write_text(path: &Path, text: String) -> Result<()> {
    tokio::fs::write(path, text)
        .await
        .map_err(|e| MapmulError::from(e).with_path(path))
}

pub async fn write_results(path: &Path, cells: &[ResultCell]) -> Result<()> {
    write_text(path, render_results(cells)).await
}

pub async fn write_dense(path: &Path, matrix: &DenseMatrix) -> Result<()> {
    write_text(path, render_dense(matrix)).await
}

pub async fn write_sparse(path: &Path, source: &dyn MatrixSource) -> Result<()> {
    let text = render_sparse(source)?;
    write_text(path, text).await
}
